//! Error taxonomy for repository and session operations
//!
//! Every operation returns one of these kinds. The boundary layer maps them
//! to transport responses via [`Error::status_code`].

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by repositories and the session manager
#[derive(Error, Debug)]
pub enum Error {
    /// Entity absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Login failed; never says which part was wrong
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, expired, revoked or otherwise invalid token
    #[error("Unauthorized")]
    Unauthorized,

    /// Acting user may not touch this entity
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Password rejected by the acceptance policy
    #[error("Weak password: {0}")]
    WeakCredential(String),

    /// Bad input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Persisted data unreadable or the medium unwritable
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Hashing or signing failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// HTTP-class status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Conflict(_) => 409,
            Error::InvalidCredentials | Error::Unauthorized => 401,
            Error::Forbidden(_) => 403,
            Error::WeakCredential(_) | Error::Validation(_) => 400,
            Error::Storage(_) | Error::Internal(_) => 500,
        }
    }

    /// Whether the record store could not be decoded
    pub fn is_corrupt_store(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_corrupt())
    }

    /// What an operator can do about a storage failure, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Storage(e) => e.recovery_suggestion(),
            _ => None,
        }
    }
}

/// Result type for repository and session operations
pub type Result<T> = std::result::Result<T, Error>;
