//! Password hashing and acceptance policy
//!
//! Hashes are Argon2id PHC strings with a fresh random salt, so hashing the
//! same password twice never yields the same output. Verification goes
//! through the argon2 verifier, which compares in constant time.
//!
//! The acceptance policy estimates entropy as `log2(charset) * length`,
//! where the charset is the union of character classes the password draws
//! from and the length ignores long runs of repeated or sequential
//! characters ("aaaa", "1234", "qwerty").

use std::collections::BTreeSet;
use std::sync::OnceLock;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::PasswordHash;

const REPLACE_CHARS: &str = "!@$&*";
const SEPARATOR_CHARS: &str = "_-., ";
const OTHER_SPECIAL_CHARS: &str = "\"#%'()+/:;<=>?[\\]^{|}~";
const LOWER_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGIT_CHARS: &str = "0123456789";

/// Runs that count as at most two characters
const SEQUENCES: &[&str] = &[
    "0123456789",
    "abcdefghijklmnopqrstuvwxyz",
    "qwertyuiop",
    "asdfghjkl",
    "zxcvbnm",
];

/// Hashes, verifies and vets passwords
#[derive(Debug, Clone)]
pub struct CredentialManager {
    min_entropy: f64,
}

impl CredentialManager {
    /// Create a manager that rejects passwords below `min_entropy` bits
    pub fn new(min_entropy: f64) -> Self {
        Self { min_entropy }
    }

    /// Create a manager using the configured entropy minimum
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_password_entropy)
    }

    /// Hash a password with a fresh salt
    pub fn hash(&self, password: &str) -> Result<PasswordHash> {
        hash_with_fresh_salt(password).map(PasswordHash::new)
    }

    /// Check `password` against a stored hash
    ///
    /// A stored hash that cannot be parsed never verifies.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        let parsed = match PhcString::new(hash.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is unreadable: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Run a verification that always fails against a real hash
    ///
    /// Used when there is no stored hash to check so that the caller takes
    /// about as long as a real verification.
    pub(crate) fn verify_dummy(&self, password: &str) {
        static DUMMY: OnceLock<Option<PasswordHash>> = OnceLock::new();

        let dummy = DUMMY.get_or_init(|| {
            hash_with_fresh_salt("chirpy-dummy-password")
                .ok()
                .map(PasswordHash::new)
        });
        if let Some(hash) = dummy {
            let _ = self.verify(password, hash);
        }
    }

    /// Apply the acceptance policy
    pub fn check_strength(&self, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::WeakCredential("password is required".to_string()));
        }

        let bits = entropy(password);
        if bits >= self.min_entropy {
            return Ok(());
        }

        Err(Error::WeakCredential(weakness_reason(password)))
    }
}

fn hash_with_fresh_salt(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Estimated entropy of `password` in bits
pub fn entropy(password: &str) -> f64 {
    let base = charset_size(password);
    let length = effective_length(password);
    if base == 0 || length == 0 {
        return 0.0;
    }
    (base as f64).log2() * length as f64
}

fn charset_size(password: &str) -> usize {
    let classes = [
        REPLACE_CHARS,
        SEPARATOR_CHARS,
        OTHER_SPECIAL_CHARS,
        LOWER_CHARS,
        UPPER_CHARS,
        DIGIT_CHARS,
    ];

    let mut size = 0;
    let mut others = BTreeSet::new();

    for class in classes {
        if password.chars().any(|c| class.contains(c)) {
            size += class.chars().count();
        }
    }
    for c in password.chars() {
        if !classes.iter().any(|class| class.contains(c)) {
            others.insert(c);
        }
    }

    size + others.len()
}

fn effective_length(password: &str) -> usize {
    let chars: Vec<char> = password.chars().collect();
    let mut kept = Vec::with_capacity(chars.len());

    for (i, &c) in chars.iter().enumerate() {
        if i >= 2 {
            let (a, b) = (chars[i - 2], chars[i - 1]);
            let repeated = a == c && b == c;
            let step = sequence_step(a, b);
            let sequential = step.is_some() && step == sequence_step(b, c);
            if repeated || sequential {
                continue;
            }
        }
        kept.push(c);
    }

    kept.len()
}

/// Direction of the step from `a` to `b` within one of the known sequences
fn sequence_step(a: char, b: char) -> Option<i8> {
    let (a, b) = (a.to_ascii_lowercase(), b.to_ascii_lowercase());
    SEQUENCES.iter().find_map(|seq| {
        let chars: Vec<char> = seq.chars().collect();
        chars.windows(2).find_map(|w| {
            if w[0] == a && w[1] == b {
                Some(1)
            } else if w[0] == b && w[1] == a {
                Some(-1)
            } else {
                None
            }
        })
    })
}

fn weakness_reason(password: &str) -> String {
    let mut hints = Vec::new();

    let has_special = password.chars().any(|c| {
        REPLACE_CHARS.contains(c) || SEPARATOR_CHARS.contains(c) || OTHER_SPECIAL_CHARS.contains(c)
    });
    if !has_special {
        hints.push("including special characters");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        hints.push("using lowercase letters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        hints.push("using uppercase letters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        hints.push("using numbers");
    }
    hints.push("using a longer password");

    let last = hints.pop().unwrap_or_default();
    if hints.is_empty() {
        format!("insecure password, try {}", last)
    } else {
        format!("insecure password, try {} or {}", hints.join(", "), last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> CredentialManager {
        CredentialManager::new(28.0)
    }

    #[test]
    fn test_hash_and_verify() {
        let credentials = manager();
        let hash = credentials.hash("secret123").unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(credentials.verify("secret123", &hash));
        assert!(!credentials.verify("secret124", &hash));
        assert!(!credentials.verify("", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let credentials = manager();
        let a = credentials.hash("secret123").unwrap();
        let b = credentials.hash("secret123").unwrap();

        assert_ne!(a, b);
        assert!(credentials.verify("secret123", &a));
        assert!(credentials.verify("secret123", &b));
    }

    #[test]
    fn test_unparseable_hash_never_verifies() {
        let credentials = manager();
        let garbage = PasswordHash::new("not a phc string".to_string());
        assert!(!credentials.verify("anything", &garbage));
    }

    #[test]
    fn test_verify_dummy_does_not_panic() {
        manager().verify_dummy("whatever");
    }

    #[test]
    fn test_entropy_estimates() {
        assert_eq!(entropy(""), 0.0);
        // 26 lowercase letters over 8 characters
        let expected = 26f64.log2() * 8.0;
        assert!((entropy("password") - expected).abs() < 1e-9);
        // Repeats and runs only count twice
        assert_eq!(effective_length("aaaaaa"), 2);
        assert_eq!(effective_length("123456"), 2);
        assert_eq!(effective_length("qwerty"), 2);
        assert_eq!(effective_length("a1b2c3"), 6);
        assert_eq!(effective_length("654321"), 2);
        assert_eq!(effective_length("121"), 3);
        assert!(entropy("Tr0ub4dor&3") > entropy("tr0ub4dor3"));
    }

    #[test]
    fn test_charset_size() {
        assert_eq!(charset_size("abc"), 26);
        assert_eq!(charset_size("aB1"), 62);
        assert_eq!(charset_size("a!"), 31);
        assert_eq!(charset_size("é"), 1);
    }

    #[test]
    fn test_check_strength() {
        let credentials = manager();

        assert!(credentials.check_strength("secret123").is_ok());
        assert!(credentials.check_strength("correct horse battery").is_ok());

        let err = credentials.check_strength("").unwrap_err();
        assert!(matches!(err, Error::WeakCredential(_)));

        let err = credentials.check_strength("abc").unwrap_err();
        assert!(matches!(err, Error::WeakCredential(_)));
        assert_eq!(err.status_code(), 400);
        let message = err.to_string();
        assert!(message.contains("using uppercase letters"));
        assert!(message.contains("using a longer password"));

        assert!(CredentialManager::new(0.0).check_strength("a").is_ok());
    }
}
