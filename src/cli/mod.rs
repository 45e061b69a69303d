use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::application::{BalanceStore, ReferralLedger};
use crate::domain::{Points, ReferralOutcome};
use crate::gateway::{self, AppState};
use crate::logging::init_logging;

/// DiceMint - points balances and referral rewards
#[derive(Parser)]
#[command(name = "dicemint")]
#[command(about = "Points balances and referral rewards over HTTP, backed by SQLite")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "DICEMINT_DB", default_value = "dicemint.db", global = true)]
    pub database: String,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "DICEMINT_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and its tables
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "DICEMINT_BIND", default_value = "0.0.0.0:5000")]
        bind: String,
    },

    /// Show a user's balance
    Balance {
        /// Telegram id
        user: String,
    },

    /// Overwrite a user's balance
    SetBalance {
        /// Telegram id
        user: String,

        /// New balance (may be negative)
        #[arg(allow_hyphen_values = true)]
        amount: Points,
    },

    /// Add points to (or remove points from) a user's balance
    Credit {
        /// Telegram id
        user: String,

        /// Points to add; negative values deduct
        #[arg(allow_hyphen_values = true)]
        delta: Points,
    },

    /// Register a referral and pay the referrer
    Refer {
        /// Telegram id of the new user
        new_user: String,

        /// Telegram id of the referrer
        #[arg(short, long)]
        referrer: String,
    },

    /// List the referrals credited to a referrer
    Referrals {
        /// Telegram id of the referrer
        referrer: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_logging(&self.log_level, self.log_json)?;

        let balances = BalanceStore::init(&self.database)
            .await
            .with_context(|| format!("Failed to open database '{}'", self.database))?;

        let result = self.dispatch(&balances).await;
        balances.close().await;
        result
    }

    async fn dispatch(self, balances: &BalanceStore) -> Result<()> {
        match self.command {
            Commands::Init => {
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind } => {
                let listener = TcpListener::bind(&bind)
                    .await
                    .with_context(|| format!("Failed to bind {}", bind))?;
                info!(database = %self.database, "starting DiceMint backend");

                gateway::serve(listener, AppState::new(balances.clone()), shutdown_signal())
                    .await?;
            }

            Commands::Balance { user } => {
                let balance = balances.get_balance(&user).await?;
                let marker = if balances.is_registered(&user).await? {
                    ""
                } else {
                    " (no record)"
                };
                println!("{}: {}{}", user, balance, marker);
            }

            Commands::SetBalance { user, amount } => {
                balances.set_balance(&user, amount).await?;
                println!("{}: {}", user, amount);
            }

            Commands::Credit { user, delta } => {
                let balance = balances.increment_balance(&user, delta).await?;
                println!("{}: {} ({:+})", user, balance, delta);
            }

            Commands::Refer { new_user, referrer } => {
                let ledger = ReferralLedger::new(balances.clone());
                match ledger.register_referral(&new_user, &referrer).await? {
                    ReferralOutcome::Registered { referrer_balance } => {
                        println!(
                            "Registered {} via {}: +{} (referrer balance {})",
                            new_user,
                            referrer,
                            ledger.reward(),
                            referrer_balance
                        );
                    }
                    ReferralOutcome::AlreadyRegistered => {
                        println!("Skipped: {} is already registered", new_user);
                    }
                }
            }

            Commands::Referrals { referrer } => {
                let ledger = ReferralLedger::new(balances.clone());
                let referrals = ledger.referrals_by(&referrer).await?;

                if referrals.is_empty() {
                    println!("No referrals for {}", referrer);
                    return Ok(());
                }

                println!("{:<8} {:<24} {}", "ID", "NEW USER", "REGISTERED");
                for referral in &referrals {
                    let registered = referral
                        .created_at
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:<8} {:<24} {}", referral.id, referral.new_user_id, registered);
                }
                println!(
                    "\n{} referral(s), {} points earned",
                    referrals.len(),
                    referrals.len() as Points * ledger.reward()
                );
            }
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
