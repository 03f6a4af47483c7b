// SPDX-License-Identifier: MPL-2.0

mod client;
mod types;

pub use client::{ClientError, SupabaseClient};
pub use types::{AuthEvent, Favorite, LocalBook, Profile, ProfileUpdate, Session, SessionUser};
