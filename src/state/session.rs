// SPDX-License-Identifier: MPL-2.0

use crate::config::APP_ID;
use crate::supabase::Session;
use secret_service::{EncryptionType, SecretService};
use thiserror::Error;

const SECRET_LABEL: &str = "Bookcase Session";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("secret service unavailable: {0}")]
    SecretService(String),
    #[error("session not found")]
    NotFound,
    #[error("invalid session data: {0}")]
    InvalidData(String),
}

fn ss_err(e: impl std::fmt::Display) -> SessionError {
    SessionError::SecretService(e.to_string())
}

/// Persists the backend session via the desktop secret service. This is the
/// single best-effort key the app keeps between runs; every caller treats a
/// failure here as "no stored session".
pub struct SessionManager;

impl SessionManager {
    pub async fn store(session: &Session) -> Result<(), SessionError> {
        let ss = SecretService::connect(EncryptionType::Dh)
            .await
            .map_err(ss_err)?;
        let collection = ss.get_default_collection().await.map_err(ss_err)?;
        if collection.is_locked().await.unwrap_or(true) {
            collection.unlock().await.map_err(ss_err)?;
        }

        let session_json =
            serde_json::to_string(session).map_err(|e| SessionError::InvalidData(e.to_string()))?;
        let attributes = vec![("application", APP_ID), ("user_id", &session.user.id)];

        collection
            .create_item(
                SECRET_LABEL,
                attributes.into_iter().collect(),
                session_json.as_bytes(),
                true, // replace existing
                "text/plain",
            )
            .await
            .map_err(ss_err)?;

        Ok(())
    }

    pub async fn load() -> Result<Session, SessionError> {
        let ss = SecretService::connect(EncryptionType::Dh)
            .await
            .map_err(ss_err)?;
        let collection = ss.get_default_collection().await.map_err(ss_err)?;
        if collection.is_locked().await.unwrap_or(true) {
            collection.unlock().await.map_err(ss_err)?;
        }

        let attributes = vec![("application", APP_ID)];
        let items = collection
            .search_items(attributes.into_iter().collect())
            .await
            .map_err(ss_err)?;
        let item = items.first().ok_or(SessionError::NotFound)?;

        let secret = item.get_secret().await.map_err(ss_err)?;
        serde_json::from_slice(&secret).map_err(|e| SessionError::InvalidData(e.to_string()))
    }

    /// Remove any stored session. Absence is not an error.
    pub async fn clear() -> Result<(), SessionError> {
        let ss = SecretService::connect(EncryptionType::Dh)
            .await
            .map_err(ss_err)?;
        let collection = ss.get_default_collection().await.map_err(ss_err)?;
        if collection.is_locked().await.unwrap_or(true) {
            collection.unlock().await.map_err(ss_err)?;
        }

        let attributes = vec![("application", APP_ID)];
        let items = collection
            .search_items(attributes.into_iter().collect())
            .await
            .map_err(ss_err)?;
        for item in items {
            item.delete().await.map_err(ss_err)?;
        }
        Ok(())
    }
}
