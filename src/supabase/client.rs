// SPDX-License-Identifier: MPL-2.0

use crate::config::BackendConfig;
use crate::supabase::types::{AuthEvent, Session};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("row not found")]
    NotFound,
    #[error("deadline exceeded")]
    Timeout,
}

/// Capacity of the auth-event channel. Events are tiny and consumers are
/// long-lived, so lag here would indicate a stuck listener.
const AUTH_EVENT_CAPACITY: usize = 16;

/// Thin client for the hosted backend: credential auth plus row operations
/// against the PostgREST surface. Wraps the wire protocol so the rest of
/// the app only sees our own types.
pub struct SupabaseClient {
    http: reqwest::Client,
    service_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    pub fn new(config: BackendConfig) -> Self {
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            service_url: config.service_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
            session: RwLock::new(None),
            auth_events,
        }
    }

    /// Subscribe to sign-in/sign-out notifications. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.session.read().unwrap().as_ref().map(|s| s.user.id.clone())
    }

    /// Adopt a previously persisted session without emitting an event.
    /// Used by the bootstrap path, which applies the identity itself.
    pub fn restore_session(&self, session: Session) {
        *self.session.write().unwrap() = Some(session);
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Option<Session>, ClientError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name }
        });

        let resp = self
            .http
            .post(format!("{}/auth/v1/signup", self.service_url))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Auth(Self::auth_error_message(resp).await));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        // With email confirmation enabled the backend returns a bare user
        // record and no tokens; the caller waits for the confirmation flow.
        if value.get("access_token").is_none() {
            return Ok(None);
        }

        let session: Session = serde_json::from_value(value)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        self.adopt(session.clone());
        Ok(Some(session))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = serde_json::json!({ "email": email, "password": password });

        let resp = self
            .http
            .post(format!(
                "{}/auth/v1/token?grant_type=password",
                self.service_url
            ))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Auth(Self::auth_error_message(resp).await));
        }

        let session: Session = resp
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        self.adopt(session.clone());
        Ok(session)
    }

    /// Clear the local identity immediately, then revoke the token with the
    /// backend. Revocation failures are logged and otherwise ignored so a
    /// flaky network can never trap the user in a signed-in state.
    pub async fn sign_out(&self) {
        let old = self.session.write().unwrap().take();
        let _ = self.auth_events.send(AuthEvent::SignedOut);

        let Some(session) = old else { return };
        let result = self
            .http
            .post(format!("{}/auth/v1/logout", self.service_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => debug!("session revoked"),
            Ok(resp) => warn!(status = %resp.status(), "sign-out rejected by backend"),
            Err(e) => warn!(error = %e, "sign-out request failed"),
        }
    }

    fn adopt(&self, session: Session) {
        *self.session.write().unwrap() = Some(session.clone());
        let _ = self.auth_events.send(AuthEvent::SignedIn(session));
    }

    async fn auth_error_message(resp: reqwest::Response) -> String {
        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(msg) = body.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
        format!("auth request failed with status {status}")
    }

    // ---- Row operations ------------------------------------------------

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.service_url)
    }

    /// Attach the API key and the strongest available credential. Row
    /// security on the backend decides what the anon role may read.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self
            .session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());
        req.header("apikey", &self.anon_key).bearer_auth(token)
    }

    /// Select rows matching the given PostgREST filters (`("user_id",
    /// "eq.<id>")` style), optionally ordered and capped.
    pub async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<T>, ClientError> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());
        if let Some(order) = order {
            query.push(("order", order.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let resp = self
            .authorize(self.http.get(self.table_url(table)).query(&query))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "select from {table} failed with status {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Select exactly one row. A zero-row result is reported as
    /// [`ClientError::NotFound`] so callers can treat it as a
    /// create-on-demand signal rather than a failure.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());

        let resp = self
            .authorize(self.http.get(self.table_url(table)).query(&query))
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_ACCEPTABLE
            || status == reqwest::StatusCode::NOT_FOUND
        {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            return Err(ClientError::Network(format!(
                "select from {table} failed with status {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn insert_row<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, ClientError> {
        let resp = self
            .authorize(self.http.post(self.table_url(table)).json(row))
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "insert into {table} failed with status {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Insert-or-merge on the given conflict target, so repeating the same
    /// logical write cannot create duplicate rows.
    pub async fn upsert_row<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
        on_conflict: &str,
    ) -> Result<R, ClientError> {
        let resp = self
            .authorize(
                self.http
                    .post(self.table_url(table))
                    .query(&[("on_conflict", on_conflict)])
                    .json(row),
            )
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "upsert into {table} failed with status {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Patch the rows matching `filters` and return the (single) updated row.
    pub async fn update_one<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        patch: &T,
    ) -> Result<R, ClientError> {
        let resp = self
            .authorize(
                self.http
                    .patch(self.table_url(table))
                    .query(&filters.to_vec())
                    .json(patch),
            )
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_ACCEPTABLE {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            return Err(ClientError::Network(format!(
                "update of {table} failed with status {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn delete_rows(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<(), ClientError> {
        let resp = self
            .authorize(self.http.delete(self.table_url(table)).query(&filters.to_vec()))
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClientError::Network(format!(
                "delete from {table} failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
