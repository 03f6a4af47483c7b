// SPDX-License-Identifier: MPL-2.0

mod search;
mod types;

pub use search::{SearchClient, SearchError, normalize_volume};
pub use types::{Book, PLACEHOLDER_COVER};
