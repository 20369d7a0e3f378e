//! Data models for Chirpy
//!
//! Defines the records kept in the store (Post, User, Credential,
//! RefreshToken) and the typed request shapes used to create or change them.
//! Every value handed out by a repository is an owned copy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a post
pub type PostId = u64;

/// Identifier of a user
pub type UserId = u64;

/// Maximum number of characters in a post body
pub const MAX_POST_LENGTH: usize = 140;

/// A short text post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Unique identifier, assigned by the store
    pub id: PostId,
    /// Post text
    pub body: String,
    /// Author of the post
    pub user_id: UserId,
    /// When this post was created
    pub created_at: DateTime<Utc>,
    /// When this post was last updated
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub body: String,
    pub user_id: UserId,
}

impl NewPost {
    pub fn new(user_id: UserId, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            user_id,
        }
    }
}

/// Changes to apply to an existing post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub body: Option<String>,
}

/// Restricts which posts a listing returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Only posts written by this user
    pub user_id: Option<UserId>,
}

impl PostFilter {
    /// Filter matching every post
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching posts written by `user_id`
    pub fn by_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub(crate) fn matches(&self, post: &Post) -> bool {
        self.user_id.map_or(true, |id| post.user_id == id)
    }
}

/// Ordering of a listing by identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    /// Apply this order to an iterator already sorted ascending
    pub(crate) fn apply<T>(self, ascending: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
        match self {
            SortOrder::Ascending => ascending.collect(),
            SortOrder::Descending => ascending.rev().collect(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order '{}', expected asc or desc", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "asc"),
            SortOrder::Descending => write!(f, "desc"),
        }
    }
}

/// A registered account
///
/// The password hash lives in a separate [`Credential`] record, so a `User`
/// is always safe to return to a caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier, assigned by the store
    pub id: UserId,
    /// Login email, unique across all users
    pub email: String,
    /// When this user was created
    pub created_at: DateTime<Utc>,
    /// When this user was last updated
    pub updated_at: DateTime<Utc>,
    /// Whether the account has been upgraded
    #[serde(default)]
    pub is_promoted: bool,
}

/// Changes to apply to an existing user
///
/// All present fields are applied in a single critical section.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_hash: Option<PasswordHash>,
    pub is_promoted: Option<bool>,
}

impl UserPatch {
    pub(crate) fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none() && self.is_promoted.is_none()
    }
}

/// Opaque output of the credential manager
///
/// Holds a PHC-format string; the plaintext password is never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub(crate) fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Stored password hash of one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub user_id: UserId,
    pub password_hash: PasswordHash,
}

/// Lifecycle state of a refresh token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
    Revoked,
}

/// Long-lived opaque token exchanged for access tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshToken {
    /// Random token string, also the primary key
    pub token: String,
    /// Owner of the token
    pub user_id: UserId,
    /// When this token was issued
    pub created_at: DateTime<Utc>,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
    /// Set once the token has been revoked
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// State of this token at `now`
    ///
    /// Revocation wins over expiry; both are terminal.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked_at.is_some() {
            TokenState::Revoked
        } else if now > self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    /// Whether this token can still mint access tokens at `now`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == TokenState::Active
    }
}
