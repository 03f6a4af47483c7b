// SPDX-License-Identifier: MPL-2.0

//! Client core for a native book catalog browser: credential auth and row
//! storage against a hosted backend, a third-party catalog search client,
//! per-user favorites, and an admin-curated local catalog. The visual
//! shell lives elsewhere; everything it needs is async API on these types.

pub mod account;
pub mod books;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod runtime;
pub mod state;
pub mod supabase;

pub use account::{AccountContext, AccountSnapshot};
pub use books::{Book, SearchClient, SearchError};
pub use catalog::{CatalogStore, LocalBookDraft};
pub use favorites::{FavoriteStatus, FavoritesStore};
pub use supabase::{ClientError, SupabaseClient};
