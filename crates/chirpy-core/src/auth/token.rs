//! Signed access tokens
//!
//! HS256 JWTs carrying the issuer, the user ID as subject, and issue and
//! expiry times in seconds. Expiry is checked against the caller's clock
//! rather than the library's, without leeway.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::UserId;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks access tokens with one signing secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.token_issuer.clone(),
            config.access_token_ttl(),
        )
    }

    /// Sign a token for `user_id` issued at `now`
    pub fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Decode and verify a token, without checking expiry
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected access token: {}", e);
                Error::Unauthorized
            })
    }

    /// Verify a token and return its subject
    ///
    /// The token must expire strictly after `now`.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<UserId> {
        let claims = self.decode(token)?;

        if claims.exp <= now.timestamp() {
            debug!("Rejected expired access token for subject {}", claims.sub);
            return Err(Error::Unauthorized);
        }

        claims.sub.parse().map_err(|_| {
            debug!("Rejected access token with malformed subject");
            Error::Unauthorized
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret", "chirpy", Duration::hours(1))
    }

    #[test]
    fn test_issue_and_validate() {
        let signer = signer();
        let now = Utc::now();

        let token = signer.issue(7, now).unwrap();
        assert_eq!(signer.validate(&token, now).unwrap(), 7);

        let claims = signer.decode(&token).unwrap();
        assert_eq!(claims.iss, "chirpy");
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expiry_is_strict() {
        let signer = signer();
        let now = Utc::now();
        let token = signer.issue(1, now).unwrap();

        let just_before = now + Duration::hours(1) - Duration::seconds(1);
        assert!(signer.validate(&token, just_before).is_ok());

        let at_expiry = now + Duration::hours(1);
        assert!(matches!(
            signer.validate(&token, at_expiry),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = signer().issue(1, Utc::now()).unwrap();
        let other = TokenSigner::new(b"other-secret", "chirpy", Duration::hours(1));

        assert!(matches!(
            other.validate(&token, Utc::now()),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = signer().issue(1, Utc::now()).unwrap();
        let other = TokenSigner::new(b"test-secret", "someone-else", Duration::hours(1));

        assert!(other.validate(&token, Utc::now()).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = signer();
        assert!(signer.validate("", Utc::now()).is_err());
        assert!(signer.validate("not.a.jwt", Utc::now()).is_err());
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let signer = signer();
        let now = Utc::now();
        let claims = Claims {
            iss: "chirpy".to_string(),
            sub: "alice".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            signer.validate(&token, now),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_debug_hides_keys() {
        let printed = format!("{:?}", signer());
        assert!(printed.contains("chirpy"));
        assert!(!printed.contains("test-secret"));
    }
}
