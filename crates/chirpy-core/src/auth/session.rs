//! Session lifecycle
//!
//! The `SessionManager` ties the store, the credential manager and the token
//! signer together:
//!
//! - `register` vets and hashes a password, then creates user and credential
//! - `login` checks the password and issues an access and a refresh token
//! - `refresh` trades a usable refresh token for a new access token
//! - `revoke` ends a refresh token for good
//!
//! Refresh tokens are not rotated on use.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use super::password::CredentialManager;
use super::token::TokenSigner;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{RefreshToken, TokenState, User, UserId, UserPatch};
use crate::store::Store;

/// Tokens handed out by a successful login
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: RefreshToken,
    pub user: User,
}

/// Issues, validates and revokes session tokens
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: Store,
    credentials: CredentialManager,
    signer: TokenSigner,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Create a session manager using the wall clock
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            credentials: CredentialManager::from_config(config),
            signer: TokenSigner::from_config(config),
            refresh_ttl: config.refresh_token_ttl(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Register a new user
    ///
    /// The password must pass the acceptance policy. Fails with `Conflict`
    /// if the email is taken.
    pub fn register(&self, email: &str, password: &str) -> Result<User> {
        self.credentials.check_strength(password)?;
        let hash = self.credentials.hash(password)?;

        let user = self.store.users().create(email, hash)?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Log in with email and password
    ///
    /// An unknown email and a wrong password fail the same way.
    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let Some((user, hash)) = self.store.users().credential_for_email(email)? else {
            self.credentials.verify_dummy(password);
            warn!("Failed login attempt");
            return Err(Error::InvalidCredentials);
        };

        if !self.credentials.verify(password, &hash) {
            warn!("Failed login attempt for user {}", user.id);
            return Err(Error::InvalidCredentials);
        }

        let now = self.clock.now();
        let access_token = self.signer.issue(user.id, now)?;
        let refresh_token = self
            .store
            .refresh_tokens()
            .create(user.id, now, self.refresh_ttl)?;

        info!("User {} logged in", user.id);
        Ok(Session {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Issue a new access token for a usable refresh token
    pub fn refresh(&self, token: &str) -> Result<String> {
        let record = self.lookup_refresh_token(token)?;
        let now = self.clock.now();

        match record.state_at(now) {
            TokenState::Active => self.signer.issue(record.user_id, now),
            TokenState::Expired => {
                info!("Refused expired refresh token of user {}", record.user_id);
                Err(Error::Unauthorized)
            }
            TokenState::Revoked => {
                warn!("Refused revoked refresh token of user {}", record.user_id);
                Err(Error::Unauthorized)
            }
        }
    }

    /// Revoke a refresh token
    ///
    /// Revoking twice keeps the first revocation time.
    pub fn revoke(&self, token: &str) -> Result<RefreshToken> {
        let record = self
            .store
            .refresh_tokens()
            .revoke(token, self.clock.now())
            .map_err(unknown_token_is_unauthorized)?;

        info!("Revoked a refresh token of user {}", record.user_id);
        Ok(record)
    }

    /// Verify an access token and return the user it was issued to
    pub fn validate_access_token(&self, token: &str) -> Result<UserId> {
        self.signer.validate(token, self.clock.now())
    }

    /// Change the email and/or password of a user in one step
    pub fn change_credentials(
        &self,
        user_id: UserId,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User> {
        let password_hash = match password {
            Some(password) => {
                self.credentials.check_strength(password)?;
                Some(self.credentials.hash(password)?)
            }
            None => None,
        };

        let user = self.store.users().update(
            user_id,
            UserPatch {
                email: email.map(str::to_string),
                password_hash,
                is_promoted: None,
            },
        )?;

        info!("Updated credentials of user {}", user.id);
        Ok(user)
    }

    fn lookup_refresh_token(&self, token: &str) -> Result<RefreshToken> {
        self.store
            .refresh_tokens()
            .get(token)
            .map_err(unknown_token_is_unauthorized)
    }
}

fn unknown_token_is_unauthorized(err: Error) -> Error {
    match err {
        Error::NotFound { .. } => Error::Unauthorized,
        other => other,
    }
}
