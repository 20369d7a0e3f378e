//! User repository
//!
//! Users and their credentials are two collections that always change
//! together, so every operation here touches both inside one write.

use chrono::Utc;
use tracing::{debug, info};

use super::require_non_empty;
use crate::error::{Error, Result};
use crate::models::{Credential, PasswordHash, SortOrder, User, UserId, UserPatch};
use crate::store::Store;

/// CRUD operations on users and their stored credentials
#[derive(Debug, Clone)]
pub struct UserRepository {
    store: Store,
}

impl UserRepository {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create a user together with its credential
    ///
    /// Fails with `Conflict` if the email is already taken.
    pub fn create(&self, email: &str, password_hash: PasswordHash) -> Result<User> {
        let email = validate_email(email)?;

        let user = self.store.write(|set| {
            if set.user_by_email(email).is_some() {
                return Err(Error::Conflict(format!("email already registered: {}", email)));
            }

            let now = Utc::now();
            let user = User {
                id: set.next_user_id(),
                email: email.to_string(),
                created_at: now,
                updated_at: now,
                is_promoted: false,
            };
            set.credentials.insert(
                user.id,
                Credential {
                    user_id: user.id,
                    password_hash,
                },
            );
            set.users.insert(user.id, user.clone());
            Ok(user)
        })?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    /// Get a user by ID
    pub fn get(&self, id: UserId) -> Result<User> {
        self.store.read(|set| {
            set.users
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::not_found("user", id))
        })
    }

    /// Find a user by email
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim();
        self.store.read(|set| Ok(set.user_by_email(email).cloned()))
    }

    /// List all users ordered by ID
    pub fn list(&self, order: SortOrder) -> Result<Vec<User>> {
        self.store
            .read(|set| Ok(order.apply(set.users.values().cloned())))
    }

    /// Apply `patch` to an existing user
    ///
    /// A new email must not belong to another user. A new password hash
    /// replaces the stored credential.
    pub fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
        let email = match patch.email {
            Some(ref email) => Some(validate_email(email)?.to_string()),
            None => None,
        };
        let unchanged = patch.is_empty();

        let user = self.store.write(|set| {
            let current = set
                .users
                .get(&id)
                .ok_or_else(|| Error::not_found("user", id))?;
            if unchanged {
                return Ok(current.clone());
            }

            if let Some(ref email) = email {
                if let Some(other) = set.user_by_email(email) {
                    if other.id != id {
                        return Err(Error::Conflict(format!(
                            "email already registered: {}",
                            email
                        )));
                    }
                }
            }

            if let Some(password_hash) = patch.password_hash {
                set.credentials.insert(
                    id,
                    Credential {
                        user_id: id,
                        password_hash,
                    },
                );
            }

            let user = set
                .users
                .get_mut(&id)
                .ok_or_else(|| Error::not_found("user", id))?;
            if let Some(email) = email {
                user.email = email;
            }
            if let Some(is_promoted) = patch.is_promoted {
                user.is_promoted = is_promoted;
            }
            user.updated_at = Utc::now();
            Ok(user.clone())
        })?;

        debug!("Updated user {}", user.id);
        Ok(user)
    }

    /// Mark a user as promoted
    pub fn promote(&self, id: UserId) -> Result<User> {
        self.update(
            id,
            UserPatch {
                is_promoted: Some(true),
                ..Default::default()
            },
        )
    }

    /// Delete a user and its credential
    ///
    /// Refresh tokens of the user are revoked rather than removed, and posts
    /// are left in place.
    pub fn delete(&self, id: UserId) -> Result<()> {
        let revoked = self.store.write(|set| {
            if set.users.remove(&id).is_none() {
                return Err(Error::not_found("user", id));
            }
            set.credentials.remove(&id);

            let now = Utc::now();
            let mut revoked = 0;
            for token in set.refresh_tokens.values_mut() {
                if token.user_id == id && token.revoked_at.is_none() {
                    token.revoked_at = Some(now);
                    revoked += 1;
                }
            }
            Ok(revoked)
        })?;

        info!("Deleted user {} ({} refresh tokens revoked)", id, revoked);
        Ok(())
    }

    /// User and stored hash for `email`, if registered
    pub(crate) fn credential_for_email(&self, email: &str) -> Result<Option<(User, PasswordHash)>> {
        let email = email.trim();
        self.store.read(|set| {
            let Some(user) = set.user_by_email(email) else {
                return Ok(None);
            };
            let credential = set.credentials.get(&user.id).ok_or_else(|| {
                Error::Internal(format!("user {} has no stored credential", user.id))
            })?;
            Ok(Some((user.clone(), credential.password_hash.clone())))
        })
    }
}

fn validate_email(email: &str) -> Result<&str> {
    let email = require_non_empty("email", email)?;
    if !email.contains('@') {
        return Err(Error::Validation(format!("invalid email address: {}", email)));
    }
    Ok(email)
}
