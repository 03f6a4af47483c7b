// SPDX-License-Identifier: MPL-2.0

use crate::books::types::{Book, PLACEHOLDER_COVER};
use crate::config::{self, DEFAULT_CATALOG_API};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Unauthenticated client for the third-party volume catalog. A static API
/// key is appended when configured; failures surface as one generic error
/// the UI turns into a retry message.
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_CATALOG_API, config::catalog_api_key())
    }

    pub fn with_base_url(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Free-text search, bounded by `max_results`. A response without an
    /// `items` array (the API's way of saying "no matches") yields an
    /// empty list, not an error.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<Book>, SearchError> {
        let mut params = vec![
            ("q".to_string(), query.to_string()),
            ("maxResults".to_string(), max_results.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key".to_string(), key.clone()));
        }
        let url = Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let body = self.fetch(url).await?;
        let items = match body.get("items").and_then(|v| v.as_array()) {
            Some(items) => items,
            None => return Ok(Vec::new()),
        };
        Ok(items.iter().map(normalize_volume).collect())
    }

    /// Fetch a single volume by the API's own record id.
    pub async fn book(&self, id: &str) -> Result<Book, SearchError> {
        let base = format!("{}/{id}", self.base_url);
        let params: Vec<(String, String)> = self
            .api_key
            .iter()
            .map(|key| ("key".to_string(), key.clone()))
            .collect();
        let url = Url::parse_with_params(&base, &params)
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let body = self.fetch(url).await?;
        Ok(normalize_volume(&body))
    }

    async fn fetch(&self, url: Url) -> Result<serde_json::Value, SearchError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SearchError::Network(format!(
                "catalog request failed with status {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))
    }
}

impl Default for SearchClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map one raw volume record into the display shape, defaulting every
/// optional field. The cover prefers the thumbnail, then the small
/// thumbnail, then a placeholder.
pub fn normalize_volume(volume: &serde_json::Value) -> Book {
    let info = volume.get("volumeInfo").cloned().unwrap_or_default();

    let string_list = |key: &str, fallback: &str| -> Vec<String> {
        match info.get(key).and_then(|v| v.as_array()) {
            Some(values) => {
                let list: Vec<String> = values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect();
                if list.is_empty() {
                    vec![fallback.to_string()]
                } else {
                    list
                }
            }
            None => vec![fallback.to_string()],
        }
    };
    let string_field = |key: &str, fallback: &str| -> String {
        info.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    };

    let cover_image = info
        .get("imageLinks")
        .and_then(|links| {
            links
                .get("thumbnail")
                .or_else(|| links.get("smallThumbnail"))
                .and_then(|v| v.as_str())
        })
        .unwrap_or(PLACEHOLDER_COVER)
        .to_string();

    Book {
        id: volume
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        title: string_field("title", "No Title"),
        authors: string_list("authors", "Unknown Author"),
        description: string_field("description", "No description available"),
        cover_image,
        publisher: string_field("publisher", "Unknown Publisher"),
        published_date: string_field("publishedDate", "Unknown Date"),
        page_count: info
            .get("pageCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        categories: string_list("categories", "Uncategorized"),
        average_rating: info
            .get("averageRating")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0),
        ratings_count: info
            .get("ratingsCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        language: string_field("language", "en"),
        preview_link: string_field("previewLink", ""),
        info_link: string_field("infoLink", ""),
    }
}
