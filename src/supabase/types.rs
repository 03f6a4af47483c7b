// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// Decoupled from the backend's wire shape so the rest of the app only
/// depends on the fields it actually uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
}

/// The identity claims carried inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata attached at sign-up (e.g. `full_name`).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl SessionUser {
    /// Display name claim from sign-up metadata, if present.
    pub fn full_name_claim(&self) -> Option<String> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Row in the `user_profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Row in the `user_favorites` table. `book_data` carries the denormalized
/// display snapshot captured at the moment the book was favorited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: String,
    pub book_id: String,
    pub book_data: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Row in the admin-curated `books` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBook {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub page_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Session lifecycle notifications delivered to subscribers.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}
