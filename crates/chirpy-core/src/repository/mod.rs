//! Collection repositories
//!
//! Typed CRUD on top of the [`Store`](crate::store::Store). Each repository
//! wraps one logical collection, assigns identifiers and timestamps and
//! enforces the collection's invariants inside the store's critical section.
//!
//! Identifiers are integers taken from a persisted per-collection sequence
//! (`max(last issued, highest existing) + 1`), so they are never reused even
//! after a delete. Refresh tokens are keyed by their random token string.

mod posts;
mod refresh_tokens;
mod users;

pub use posts::PostRepository;
pub use refresh_tokens::RefreshTokenRepository;
pub use users::UserRepository;

use crate::error::{Error, Result};

/// Reject a required text field that is empty or only whitespace
fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}
