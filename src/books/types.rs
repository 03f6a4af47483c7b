// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// Placeholder shown when a volume carries no cover art.
pub const PLACEHOLDER_COVER: &str = "/api/placeholder/150/200";

/// Normalized display shape for an externally sourced book. Every field is
/// defaulted during normalization so rendering never has to branch on
/// presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub cover_image: String,
    pub publisher: String,
    pub published_date: String,
    pub page_count: u32,
    pub categories: Vec<String>,
    pub average_rating: f64,
    pub ratings_count: u32,
    pub language: String,
    pub preview_link: String,
    pub info_link: String,
}

impl Book {
    /// First author, for compact list rows.
    pub fn primary_author(&self) -> &str {
        self.authors.first().map(String::as_str).unwrap_or("Unknown Author")
    }

    /// First category, used as the favorite snapshot's category field.
    pub fn primary_category(&self) -> &str {
        self.categories
            .first()
            .map(String::as_str)
            .unwrap_or("Uncategorized")
    }
}
