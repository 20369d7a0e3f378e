//! Refresh token repository
//!
//! Tokens are keyed by their random string and never deleted; revocation
//! only stamps `revoked_at`.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{RefreshToken, SortOrder, UserId};
use crate::store::Store;

/// Random bytes per refresh token
const TOKEN_BYTES: usize = 32;

/// Generate a fresh opaque token string
///
/// 256 bits from the OS random source, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Loggable form of a token that does not reveal it
fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}

/// Issue, look up and revoke refresh tokens
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    store: Store,
}

impl RefreshTokenRepository {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    /// Issue a token for `user_id` valid from `issued_at` for `ttl`
    pub fn create(
        &self,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<RefreshToken> {
        if ttl <= Duration::zero() {
            return Err(Error::Validation(
                "refresh token lifetime must be positive".to_string(),
            ));
        }

        let token = self.store.write(|set| {
            if !set.users.contains_key(&user_id) {
                return Err(Error::not_found("user", user_id));
            }

            let mut token = generate_token();
            while set.refresh_tokens.contains_key(&token) {
                token = generate_token();
            }

            let record = RefreshToken {
                token,
                user_id,
                created_at: issued_at,
                expires_at: issued_at + ttl,
                revoked_at: None,
            };
            set.refresh_tokens
                .insert(record.token.clone(), record.clone());
            Ok(record)
        })?;

        debug!(
            "Issued refresh token {} for user {}",
            token_hint(&token.token),
            user_id
        );
        Ok(token)
    }

    /// Look up a token by its string
    pub fn get(&self, token: &str) -> Result<RefreshToken> {
        self.store.read(|set| {
            set.refresh_tokens
                .get(token)
                .cloned()
                .ok_or_else(|| Error::not_found("refresh token", token_hint(token)))
        })
    }

    /// Revoke a token at `at`
    ///
    /// Revoking twice keeps the first revocation time.
    pub fn revoke(&self, token: &str, at: DateTime<Utc>) -> Result<RefreshToken> {
        let record = self.store.write(|set| {
            let record = set
                .refresh_tokens
                .get_mut(token)
                .ok_or_else(|| Error::not_found("refresh token", token_hint(token)))?;
            if record.revoked_at.is_none() {
                record.revoked_at = Some(at);
            }
            Ok(record.clone())
        })?;

        debug!(
            "Revoked refresh token {} of user {}",
            token_hint(token),
            record.user_id
        );
        Ok(record)
    }

    /// Tokens issued to `user_id`, ordered by issue time
    pub fn list_for_user(&self, user_id: UserId, order: SortOrder) -> Result<Vec<RefreshToken>> {
        self.store.read(|set| {
            let mut tokens: Vec<RefreshToken> = set
                .refresh_tokens
                .values()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect();
            tokens.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.token.cmp(&b.token))
            });
            Ok(order.apply(tokens.into_iter()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PasswordHash, TokenState};
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> (Store, UserId) {
        let store = Store::open_path(temp_dir.path().join("database.json")).unwrap();
        let user = store
            .users()
            .create("a@x.com", PasswordHash::new("$argon2id$test".to_string()))
            .unwrap();
        (store, user.id)
    }

    #[test]
    fn test_generated_tokens() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_hint_hides_token() {
        let token = generate_token();
        let hint = token_hint(&token);
        assert!(hint.len() < token.len());
        assert!(token.starts_with(hint.trim_end_matches('.')));
        assert_eq!(token_hint("ab"), "ab...");
    }

    #[test]
    fn test_create_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let (store, user_id) = test_store(&temp_dir);
        let now = Utc::now();

        let token = store
            .refresh_tokens()
            .create(user_id, now, Duration::days(60))
            .unwrap();

        assert_eq!(token.user_id, user_id);
        assert_eq!(token.created_at, now);
        assert_eq!(token.expires_at, now + Duration::days(60));
        assert!(token.revoked_at.is_none());
        assert_eq!(store.refresh_tokens().get(&token.token).unwrap(), token);
    }

    #[test]
    fn test_create_for_missing_user() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = test_store(&temp_dir);

        let err = store
            .refresh_tokens()
            .create(42, Utc::now(), Duration::days(1))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));
    }

    #[test]
    fn test_create_rejects_non_positive_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let (store, user_id) = test_store(&temp_dir);

        let err = store
            .refresh_tokens()
            .create(user_id, Utc::now(), Duration::zero())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_get_unknown_does_not_echo_token() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = test_store(&temp_dir);
        let unknown = generate_token();

        let err = store.refresh_tokens().get(&unknown).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(!err.to_string().contains(&unknown));
    }

    #[test]
    fn test_revoke_keeps_first_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let (store, user_id) = test_store(&temp_dir);
        let now = Utc::now();
        let token = store
            .refresh_tokens()
            .create(user_id, now, Duration::days(1))
            .unwrap();

        let first = now + Duration::minutes(5);
        let revoked = store.refresh_tokens().revoke(&token.token, first).unwrap();
        assert_eq!(revoked.revoked_at, Some(first));
        assert_eq!(revoked.state_at(first), TokenState::Revoked);

        let again = store
            .refresh_tokens()
            .revoke(&token.token, first + Duration::minutes(5))
            .unwrap();
        assert_eq!(again.revoked_at, Some(first));

        // Revoked tokens stay in the store
        assert_eq!(store.stats().unwrap().refresh_tokens, 1);
    }

    #[test]
    fn test_revoke_unknown() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = test_store(&temp_dir);

        let err = store
            .refresh_tokens()
            .revoke("nope", Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_list_for_user() {
        let temp_dir = TempDir::new().unwrap();
        let (store, user_id) = test_store(&temp_dir);
        let other = store
            .users()
            .create("b@x.com", PasswordHash::new("$argon2id$test".to_string()))
            .unwrap();
        let now = Utc::now();
        let tokens = store.refresh_tokens();

        let older = tokens.create(user_id, now, Duration::days(1)).unwrap();
        let newer = tokens
            .create(user_id, now + Duration::seconds(10), Duration::days(1))
            .unwrap();
        tokens.create(other.id, now, Duration::days(1)).unwrap();

        let listed = tokens.list_for_user(user_id, SortOrder::Ascending).unwrap();
        assert_eq!(listed, vec![older.clone(), newer.clone()]);

        let listed = tokens.list_for_user(user_id, SortOrder::Descending).unwrap();
        assert_eq!(listed, vec![newer, older]);
    }
}
