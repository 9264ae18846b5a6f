// src/client.rs
//! Remote operations against the tracker service, plus the live-sync
//! subscription that keeps a [`Dashboard`] mirrored.
//!
//! Every create/update/delete is fire-and-forget from the UI's point of
//! view: it either confirms (and the authoritative state arrives as the
//! next snapshot) or fails with a short message for the error-display
//! region. Nothing retries automatically.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::models::{
    Dividend, Member, NewDividend, NewMember, NewSymbol, NewTransaction, SignInRequest, Snapshot,
    Symbol, TokenResponse, Transaction,
};
use crate::state::{Dashboard, DraftRecord};
use crate::stats::Stats;

pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Obtain a token for the given stable user identifier and hold it for
    /// all subsequent requests.
    pub async fn sign_in(&mut self, user_id: &str) -> Result<(), ClientError> {
        let request = SignInRequest {
            user_id: user_id.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/signin", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = check(response).await?;
        let body: TokenResponse = response.json().await?;
        self.token = Some(body.token);
        info!("Signed in as {}", user_id);
        Ok(())
    }

    // ---- snapshot reads ----

    pub async fn fetch_members(&self) -> Result<Vec<Member>, ClientError> {
        self.get_json("/members").await
    }

    pub async fn fetch_symbols(&self) -> Result<Vec<Symbol>, ClientError> {
        self.get_json("/symbols").await
    }

    pub async fn fetch_transactions(&self) -> Result<Vec<Transaction>, ClientError> {
        self.get_json("/transactions").await
    }

    pub async fn fetch_dividends(&self) -> Result<Vec<Dividend>, ClientError> {
        self.get_json("/dividends").await
    }

    /// Server-side evaluation of the aggregation for one filter.
    pub async fn fetch_stats(&self, member: Option<&str>) -> Result<Stats, ClientError> {
        let path = match member {
            Some(name) => format!("/stats?member={}", name),
            None => "/stats".to_string(),
        };
        self.get_json(&path).await
    }

    // ---- mutations ----

    pub async fn create_member(&self, new: &NewMember) -> Result<Member, ClientError> {
        self.post_json("/members", new).await
    }

    pub async fn update_member(&self, member: &Member) -> Result<(), ClientError> {
        self.put_json("/members", member).await
    }

    pub async fn delete_member(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/members/{}", id)).await
    }

    pub async fn create_symbol(&self, new: &NewSymbol) -> Result<Symbol, ClientError> {
        self.post_json("/symbols", new).await
    }

    pub async fn update_symbol(&self, symbol: &Symbol) -> Result<(), ClientError> {
        self.put_json("/symbols", symbol).await
    }

    pub async fn delete_symbol(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/symbols/{}", id)).await
    }

    pub async fn create_transaction(
        &self,
        new: &NewTransaction,
    ) -> Result<Transaction, ClientError> {
        self.post_json("/transactions", new).await
    }

    pub async fn update_transaction(&self, transaction: &Transaction) -> Result<(), ClientError> {
        self.put_json("/transactions", transaction).await
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/transactions/{}", id)).await
    }

    pub async fn create_dividend(&self, new: &NewDividend) -> Result<Dividend, ClientError> {
        self.post_json("/dividends", new).await
    }

    pub async fn update_dividend(&self, dividend: &Dividend) -> Result<(), ClientError> {
        self.put_json("/dividends", dividend).await
    }

    pub async fn delete_dividend(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/dividends/{}", id)).await
    }

    /// Write one staged draft back to the store. The draft is discarded
    /// only on confirmation; on failure it stays put, the message lands in
    /// the dashboard's error region, and the mirrors keep showing the
    /// last-known-good snapshots.
    pub async fn commit_draft(
        &self,
        dashboard: &Arc<Mutex<Dashboard>>,
        draft: DraftRecord,
    ) -> Result<(), ClientError> {
        let result = match &draft {
            DraftRecord::Member(m) => self.update_member(m).await,
            DraftRecord::Symbol(s) => self.update_symbol(s).await,
            DraftRecord::Transaction(t) => self.update_transaction(t).await,
            DraftRecord::Dividend(d) => self.update_dividend(d).await,
        };
        match result {
            Ok(()) => {
                if let Ok(mut dash) = dashboard.lock() {
                    dash.discard_draft(draft.id());
                    dash.clear_error();
                }
                Ok(())
            }
            Err(e) => {
                if let Ok(mut dash) = dashboard.lock() {
                    dash.set_error(format!("Save failed: {}", e));
                }
                Err(e)
            }
        }
    }

    // ---- live sync ----

    /// Start the live subscription feeding `dashboard`. Requires a prior
    /// `sign_in`. The returned handle cancels the subscription when asked
    /// to (or when dropped).
    pub fn subscribe(
        &self,
        dashboard: Arc<Mutex<Dashboard>>,
    ) -> Result<SubscriptionHandle, ClientError> {
        let token = self.token.clone().ok_or("Not signed in")?;
        let ws_url = format!(
            "{}/ws?token={}",
            self.base_url
                .replacen("http://", "ws://", 1)
                .replacen("https://", "wss://", 1),
            token
        );
        Ok(spawn_subscription(ws_url, dashboard))
    }

    // ---- request plumbing ----

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .authorized(self.http.get(format!("{}{}", self.base_url, path)))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .authorized(self.http.post(format!("{}{}", self.base_url, path)))
            .json(body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        let response = self
            .authorized(self.http.put(format!("{}{}", self.base_url, path)))
            .json(body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self
            .authorized(self.http.delete(format!("{}{}", self.base_url, path)))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into the server's `{"error": ...}` message,
/// falling back to the bare status code.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status));
    Err(message.into())
}

/// Handle for an active live-sync subscription: the subscribe/unsubscribe
/// capability. Cancelling (or dropping) it stops the background task; the
/// dashboard keeps its last-known-good mirrors.
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_subscription(ws_url: String, dashboard: Arc<Mutex<Dashboard>>) -> SubscriptionHandle {
    let task = tokio::spawn(async move {
        let (stream, _) = match connect_async(ws_url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                error!("Live sync connection failed: {}", e);
                if let Ok(mut dash) = dashboard.lock() {
                    dash.set_error(format!("Live sync unavailable: {}", e));
                }
                return;
            }
        };
        info!("Live sync connected");
        let (_tx, mut rx) = stream.split();
        while let Some(message) = rx.next().await {
            match message {
                Ok(Message::Text(payload)) => match serde_json::from_str::<Snapshot>(&payload) {
                    Ok(snapshot) => {
                        if let Ok(mut dash) = dashboard.lock() {
                            dash.apply_snapshot(snapshot);
                            dash.clear_error();
                        }
                    }
                    Err(e) => warn!("Ignoring malformed snapshot: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    error!("Live sync stream error: {}", e);
                    if let Ok(mut dash) = dashboard.lock() {
                        dash.set_error(format!("Live sync interrupted: {}", e));
                    }
                    break;
                }
            }
        }
        info!("Live sync disconnected");
    });
    SubscriptionHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_requires_sign_in() {
        let client = ApiClient::new("http://127.0.0.1:3030");
        let dashboard = Arc::new(Mutex::new(Dashboard::new()));
        assert!(client.subscribe(dashboard).is_err());
    }

    #[tokio::test]
    async fn cancelled_subscription_goes_inactive() {
        let dashboard = Arc::new(Mutex::new(Dashboard::new()));
        // Points at nothing; the task ends (or is aborted) either way.
        let handle = spawn_subscription(
            "ws://127.0.0.1:9/ws?token=x".to_string(),
            dashboard.clone(),
        );
        handle.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_active());
    }
}
