// SPDX-License-Identifier: MPL-2.0

//! Access to the per-user favorites table: list, add, remove, and an
//! explicit three-valued membership check.

use crate::books::Book;
use crate::config::FAVORITES_FETCH_DEADLINE;
use crate::supabase::{ClientError, Favorite, SupabaseClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const TABLE: &str = "user_favorites";

/// Membership result for one (user, book) pair. `Unknown` means the check
/// itself failed; callers must not render it as "not favorited".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteStatus {
    Favorited,
    NotFavorited,
    Unknown,
}

pub struct FavoritesStore {
    client: Arc<SupabaseClient>,
    list_deadline: Duration,
}

impl FavoritesStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self {
            client,
            list_deadline: FAVORITES_FETCH_DEADLINE,
        }
    }

    /// Override the list deadline (tests, slow links).
    pub fn with_list_deadline(mut self, deadline: Duration) -> Self {
        self.list_deadline = deadline;
        self
    }

    /// All favorites of the active user, newest first. Signed-out callers
    /// get an empty list; a fetch slower than the deadline fails with
    /// [`ClientError::Timeout`] instead of hanging the caller.
    pub async fn list(&self) -> Result<Vec<Favorite>, ClientError> {
        let Some(user_id) = self.client.current_user_id() else {
            return Ok(Vec::new());
        };

        let filters = [("user_id", format!("eq.{user_id}"))];
        let fetch = self
            .client
            .select_rows(TABLE, &filters, Some("created_at.desc"), None);
        tokio::time::timeout(self.list_deadline, fetch)
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Favorite a book, storing the display snapshot alongside the key.
    /// Issued as an upsert on (user_id, book_id) so a double-tap cannot
    /// create duplicate rows.
    pub async fn add(&self, book: &Book) -> Result<Favorite, ClientError> {
        let user_id = self
            .client
            .current_user_id()
            .ok_or(ClientError::NotAuthenticated)?;

        let row = serde_json::json!({
            "user_id": user_id,
            "book_id": book.id,
            "book_data": book,
        });
        self.client.upsert_row(TABLE, &row, "user_id,book_id").await
    }

    pub async fn remove(&self, book_id: &str) -> Result<(), ClientError> {
        let user_id = self
            .client
            .current_user_id()
            .ok_or(ClientError::NotAuthenticated)?;

        let filters = [
            ("user_id", format!("eq.{user_id}")),
            ("book_id", format!("eq.{book_id}")),
        ];
        self.client.delete_rows(TABLE, &filters).await
    }

    /// Check whether the active user has favorited `book_id`. A failed
    /// check reports `Unknown` rather than masquerading as "no".
    pub async fn status(&self, book_id: &str) -> FavoriteStatus {
        let Some(user_id) = self.client.current_user_id() else {
            return FavoriteStatus::NotFavorited;
        };

        let filters = [
            ("user_id", format!("eq.{user_id}")),
            ("book_id", format!("eq.{book_id}")),
        ];
        match self
            .client
            .select_rows::<Favorite>(TABLE, &filters, None, Some(1))
            .await
        {
            Ok(rows) if rows.is_empty() => FavoriteStatus::NotFavorited,
            Ok(_) => FavoriteStatus::Favorited,
            Err(e) => {
                debug!(book_id, error = %e, "favorite status check failed");
                FavoriteStatus::Unknown
            }
        }
    }
}
