use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::domain::{Points, Referral, apply_delta};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_REFERRAL_GUARDS};

/// How long a connection waits for the write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 5;

/// What the referral transaction wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationWrite {
    /// All three writes committed.
    Registered { referrer_balance: Points },
    /// The new user already had a balance row; nothing was written.
    AlreadyRegistered,
    /// Crediting the referrer would overflow; the transaction was rolled back.
    RewardOverflow,
}

/// Repository for persisting and querying balances and referrals.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the SQLite database file at `path`.
    /// Creates the file if it doesn't exist. The path is used verbatim, never parsed as a URL.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if absent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        // Databases created before referral timestamps lack the column.
        let has_created_at: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('referrals') WHERE name = 'created_at'",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to inspect referrals table")?;
        if has_created_at == 0 {
            sqlx::query("ALTER TABLE referrals ADD COLUMN created_at TEXT")
                .execute(&self.pool)
                .await
                .context("Failed to add referrals.created_at")?;
        }

        self.drop_duplicate_referrals().await?;

        sqlx::raw_sql(MIGRATION_002_REFERRAL_GUARDS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Keep only the oldest referral row per new user so the unique index can be built.
    ///
    /// Older deployments could record the same new user twice under concurrent
    /// requests. The later rows are removed and their ids logged.
    async fn drop_duplicate_referrals(&self) -> Result<()> {
        let duplicated: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT new_user_id
            FROM referrals
            GROUP BY new_user_id
            HAVING COUNT(*) > 1
            ORDER BY new_user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to look for duplicate referrals")?;

        if duplicated.is_empty() {
            return Ok(());
        }

        let removed = sqlx::query(
            r#"
            DELETE FROM referrals
            WHERE id NOT IN (SELECT MIN(id) FROM referrals GROUP BY new_user_id)
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to remove duplicate referrals")?
        .rows_affected();

        warn!(
            removed,
            new_user_ids = %duplicated.join(","),
            "removed duplicate referral rows, kept the oldest per user"
        );
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Self::connect(path).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Balance operations
    // ========================

    /// Get a user's balance, if a row exists. A NULL balance reads as 0.
    pub async fn get_balance(&self, telegram_id: &str) -> Result<Option<Points>> {
        let row = sqlx::query("SELECT balance FROM balances WHERE telegram_id = ?")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        Ok(row.map(|row| row.get::<Option<Points>, _>("balance").unwrap_or(0)))
    }

    /// Upsert a balance to exactly `amount`.
    pub async fn set_balance(&self, telegram_id: &str, amount: Points) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO balances (telegram_id, balance)
            VALUES (?, ?)
            ON CONFLICT(telegram_id) DO UPDATE SET balance = excluded.balance
            "#,
        )
        .bind(telegram_id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .context("Failed to save balance")?;
        Ok(())
    }

    /// Add `delta` to a balance inside one write transaction.
    /// Returns the new balance, or `None` if it would overflow (nothing is written).
    pub async fn increment_balance(
        &self,
        telegram_id: &str,
        delta: Points,
    ) -> Result<Option<Points>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let Some(balance) = Self::add_points(&mut tx, telegram_id, delta).await? else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(None);
        };

        tx.commit().await.context("Failed to commit balance update")?;
        Ok(Some(balance))
    }

    /// Credit `delta` to a user on an open connection, creating the row if needed.
    ///
    /// The first statement is a write, so SQLite takes the write lock before the
    /// balance is read and no other writer can interleave between read and update.
    async fn add_points(
        conn: &mut SqliteConnection,
        telegram_id: &str,
        delta: Points,
    ) -> Result<Option<Points>> {
        sqlx::query(
            "INSERT INTO balances (telegram_id, balance) VALUES (?, 0) ON CONFLICT(telegram_id) DO NOTHING",
        )
        .bind(telegram_id)
        .execute(&mut *conn)
        .await
        .context("Failed to create balance row")?;

        let current: Option<Points> =
            sqlx::query_scalar("SELECT balance FROM balances WHERE telegram_id = ?")
                .bind(telegram_id)
                .fetch_one(&mut *conn)
                .await
                .context("Failed to read balance")?;

        let Some(updated) = apply_delta(current.unwrap_or(0), delta) else {
            return Ok(None);
        };

        sqlx::query("UPDATE balances SET balance = ? WHERE telegram_id = ?")
            .bind(updated)
            .bind(telegram_id)
            .execute(&mut *conn)
            .await
            .context("Failed to update balance")?;

        Ok(Some(updated))
    }

    // ========================
    // Referral operations
    // ========================

    /// Register `new_user_id` as referred by `referrer_id` and credit `reward`.
    ///
    /// The existence check is the conditional insert of the new user's row, so
    /// check and writes share one transaction. Self-referrals must be rejected
    /// by the caller.
    pub async fn register_referral(
        &self,
        new_user_id: &str,
        referrer_id: &str,
        reward: Points,
    ) -> Result<RegistrationWrite> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let created = sqlx::query(
            "INSERT INTO balances (telegram_id, balance) VALUES (?, 0) ON CONFLICT(telegram_id) DO NOTHING",
        )
        .bind(new_user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to create new user balance")?
        .rows_affected();

        if created == 0 {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(RegistrationWrite::AlreadyRegistered);
        }

        sqlx::query(
            "INSERT INTO referrals (referrer_id, new_user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(referrer_id)
        .bind(new_user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save referral")?;

        let Some(referrer_balance) = Self::add_points(&mut tx, referrer_id, reward).await? else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(RegistrationWrite::RewardOverflow);
        };

        tx.commit().await.context("Failed to commit referral")?;
        Ok(RegistrationWrite::Registered { referrer_balance })
    }

    /// List referrals credited to a referrer, oldest first.
    pub async fn list_referrals_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        let rows = sqlx::query(
            r#"
            SELECT id, referrer_id, new_user_id, created_at
            FROM referrals
            WHERE referrer_id = ?
            ORDER BY id
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list referrals")?;

        rows.iter().map(Self::row_to_referral).collect()
    }

    /// Count referral rows naming `new_user_id` as the referred user.
    pub async fn count_referrals_for_new_user(&self, new_user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE new_user_id = ?")
            .bind(new_user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count referrals")?;
        Ok(count)
    }

    fn row_to_referral(row: &sqlx::sqlite::SqliteRow) -> Result<Referral> {
        let created_at_str: Option<String> = row.get("created_at");

        Ok(Referral {
            id: row.get("id"),
            referrer_id: row.get("referrer_id"),
            new_user_id: row.get("new_user_id"),
            created_at: created_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid created_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}
