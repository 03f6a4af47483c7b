// SPDX-License-Identifier: MPL-2.0

//! Admin-curated local catalog: CRUD against the `books` table plus the
//! form-layer checks the UI applies before submitting.

use crate::supabase::{ClientError, LocalBook, SupabaseClient};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

const TABLE: &str = "books";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("required field missing: {0}")]
    MissingField(&'static str),
}

/// Editable fields of a local book, as gathered from the admin form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocalBookDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_image: String,
    pub category: String,
    pub publisher: String,
    pub published_date: String,
    pub page_count: Option<i64>,
}

impl LocalBookDraft {
    /// Required-field presence: title and author must be non-blank.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::MissingField("title"));
        }
        if self.author.trim().is_empty() {
            return Err(FormError::MissingField("author"));
        }
        Ok(())
    }
}

/// Coerce the page-count text input to a number. Blank or unparsable
/// input becomes "unset" rather than an error.
pub fn parse_page_count(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok().filter(|n| *n >= 0)
}

pub struct CatalogStore {
    client: Arc<SupabaseClient>,
}

impl CatalogStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    /// Every curated book, newest first.
    pub async fn list(&self) -> Result<Vec<LocalBook>, ClientError> {
        self.client
            .select_rows(TABLE, &[], Some("created_at.desc"), None)
            .await
    }

    pub async fn get(&self, id: i64) -> Result<LocalBook, ClientError> {
        self.client
            .select_one(TABLE, &[("id", format!("eq.{id}"))])
            .await
    }

    pub async fn add(&self, draft: &LocalBookDraft) -> Result<LocalBook, ClientError> {
        self.client.insert_row(TABLE, draft).await
    }

    pub async fn update(&self, id: i64, draft: &LocalBookDraft) -> Result<LocalBook, ClientError> {
        self.client
            .update_one(TABLE, &[("id", format!("eq.{id}"))], draft)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        self.client
            .delete_rows(TABLE, &[("id", format!("eq.{id}"))])
            .await
    }
}
