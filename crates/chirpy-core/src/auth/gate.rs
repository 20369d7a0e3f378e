//! Request authorization
//!
//! Pulls the bearer token out of a request's headers, validates it and
//! resolves the acting user before any business logic runs. Transports plug
//! in by implementing [`HeaderLookup`].

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use tracing::debug;

use super::session::SessionManager;
use crate::error::{Error, Result};
use crate::models::User;

/// Header carrying the credential
pub const AUTHORIZATION: &str = "Authorization";

/// Scheme of access tokens
pub const BEARER: &str = "Bearer";

/// Scheme of API keys
pub const API_KEY: &str = "ApiKey";

/// Read access to request headers
///
/// Header names compare case-insensitively.
pub trait HeaderLookup {
    fn header(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> HeaderLookup for HashMap<String, String, S> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl HeaderLookup for BTreeMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Extract the credential from a `"<scheme> <token>"` header value
///
/// The scheme is case-sensitive. A missing header, another scheme or an
/// empty token is `Unauthorized`.
pub fn extract_token<'a>(value: Option<&'a str>, scheme: &str) -> Result<&'a str> {
    let value = value.ok_or(Error::Unauthorized)?;

    let token = value
        .trim()
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix(' '))
        .map(str::trim)
        .ok_or(Error::Unauthorized)?;

    if token.is_empty() {
        return Err(Error::Unauthorized);
    }
    Ok(token)
}

/// Resolves the acting user of a request
#[derive(Debug, Clone)]
pub struct Gate {
    sessions: SessionManager,
}

impl Gate {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Authorize a request from its headers
    ///
    /// A valid token whose user no longer exists is `Unauthorized`.
    pub fn authorize(&self, headers: &impl HeaderLookup) -> Result<User> {
        let token = extract_token(headers.header(AUTHORIZATION), BEARER)?;
        self.authorize_token(token)
    }

    /// Authorize a bare access token
    pub fn authorize_token(&self, token: &str) -> Result<User> {
        let user_id = self.sessions.validate_access_token(token)?;

        match self.sessions.store().users().get(user_id) {
            Ok(user) => Ok(user),
            Err(Error::NotFound { .. }) => {
                debug!("Access token for deleted user {}", user_id);
                Err(Error::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }
}
