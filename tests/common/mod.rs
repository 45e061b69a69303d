// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use dicemint::application::{BalanceStore, ReferralLedger};
use dicemint::gateway::{self, AppState};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Helper to create a balance store with a temporary database
pub async fn test_store() -> Result<(BalanceStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = BalanceStore::init(db_path.to_str().unwrap()).await?;
    Ok((store, temp_dir))
}

/// Helper to create a referral ledger (and its balance store) with a temporary database
pub async fn test_ledger() -> Result<(ReferralLedger, BalanceStore, TempDir)> {
    let (store, temp_dir) = test_store().await?;
    let ledger = ReferralLedger::new(store.clone());
    Ok((ledger, store, temp_dir))
}

/// A running HTTP server on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub store: BalanceStore,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    _temp: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let (store, temp) = test_store().await?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = AppState::new(store.clone());
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            gateway::serve(listener, state, shutdown).await
        });

        Ok(Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            shutdown: Some(shutdown_tx),
            _temp: temp,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and return (status, parsed body).
    pub async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(reqwest::StatusCode, serde_json::Value)> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        let status = response.status();
        let body = response.json().await?;
        Ok((status, body))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
