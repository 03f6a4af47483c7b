// SPDX-License-Identifier: MPL-2.0

#![allow(dead_code)]

use std::time::Duration;

pub const APP_ID: &str = "io.github.bookcase.Bookcase";
pub const APP_NAME: &str = "Bookcase";

#[cfg(feature = "devel")]
pub const IS_DEVEL: bool = true;
#[cfg(not(feature = "devel"))]
pub const IS_DEVEL: bool = false;

pub const DEFAULT_CATALOG_API: &str = "https://www.googleapis.com/books/v1/volumes";

/// Default number of results requested from the catalog search API.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Deadline for the single-row profile lookup after sign-in.
pub const PROFILE_FETCH_DEADLINE: Duration = Duration::from_secs(5);

/// Deadline for loading the favorites list.
pub const FAVORITES_FETCH_DEADLINE: Duration = Duration::from_secs(10);

/// Connection details for the hosted backend, injected via the environment
/// (the desktop analog of the original build-time configuration).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub service_url: String,
    pub anon_key: String,
}

impl BackendConfig {
    /// Read `BOOKCASE_SERVICE_URL` and `BOOKCASE_ANON_KEY`. Returns `None`
    /// if either is missing; the app then runs signed-out with search only.
    pub fn from_env() -> Option<Self> {
        let service_url = std::env::var("BOOKCASE_SERVICE_URL").ok()?;
        let anon_key = std::env::var("BOOKCASE_ANON_KEY").ok()?;
        Some(Self {
            service_url,
            anon_key,
        })
    }
}

/// API key for the catalog search service, if configured.
pub fn catalog_api_key() -> Option<String> {
    std::env::var("BOOKCASE_CATALOG_API_KEY").ok()
}
