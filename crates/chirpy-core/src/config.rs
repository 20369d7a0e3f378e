//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/chirpy/config.toml)
//! 3. Environment variables (CHIRPY_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! The resulting `Config` is built once at startup and passed by reference to
//! the store and the session manager; nothing mutates it afterwards.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "CHIRPY";

/// Default issuer written into access tokens
pub const DEFAULT_TOKEN_ISSUER: &str = "chirpy";

/// Upper bound for access token lifetime (one year)
const MAX_ACCESS_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Upper bound for refresh token lifetime (ten years)
const MAX_REFRESH_TOKEN_TTL_DAYS: u64 = 3650;

/// Application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the record store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Secret used to sign access tokens
    #[serde(default)]
    pub jwt_secret: String,

    /// Issuer claim written into and required from access tokens
    #[serde(default = "default_token_issuer")]
    pub token_issuer: String,

    /// Lifetime of access tokens, in seconds
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,

    /// Lifetime of refresh tokens, in days
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: u64,

    /// Minimum estimated password entropy, in bits
    #[serde(default = "default_min_password_entropy")]
    pub min_password_entropy: f64,

    /// Log file path (optional, logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            jwt_secret: String::new(),
            token_issuer: default_token_issuer(),
            access_token_ttl_secs: default_access_token_ttl_secs(),
            refresh_token_ttl_days: default_refresh_token_ttl_days(),
            min_password_entropy: default_min_password_entropy(),
            log_file: None,
        }
    }
}

// Keeps the signing secret out of logs and panic messages
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &"<redacted>")
            .field("token_issuer", &self.token_issuer)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("min_password_entropy", &self.min_password_entropy)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CHIRPY_DATA_DIR, CHIRPY_JWT_SECRET, ...)
    /// 2. Config file (~/.config/chirpy/config.toml or CHIRPY_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load the effective configuration without validating it
    ///
    /// For inspecting a setup that may not be complete yet.
    pub fn load_unchecked() -> Result<Self> {
        let mut config = Self::read_file(&Self::config_file_path())?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Read only the config file at `path`, or defaults if it is missing
    ///
    /// No environment overrides and no validation.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("JWT_SECRET") {
            self.jwt_secret = val;
        }

        if let Some(val) = env_var("TOKEN_ISSUER") {
            self.token_issuer = val;
        }

        if let Some(val) = env_var("ACCESS_TOKEN_TTL_SECS") {
            self.access_token_ttl_secs = val
                .parse()
                .with_context(|| format!("Invalid {}_ACCESS_TOKEN_TTL_SECS: {}", ENV_PREFIX, val))?;
        }

        if let Some(val) = env_var("REFRESH_TOKEN_TTL_DAYS") {
            self.refresh_token_ttl_days = val.parse().with_context(|| {
                format!("Invalid {}_REFRESH_TOKEN_TTL_DAYS: {}", ENV_PREFIX, val)
            })?;
        }

        if let Some(val) = env_var("MIN_PASSWORD_ENTROPY") {
            self.min_password_entropy = val
                .parse()
                .with_context(|| format!("Invalid {}_MIN_PASSWORD_ENTROPY: {}", ENV_PREFIX, val))?;
        }

        if let Some(val) = env_var("LOG_FILE") {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        Ok(())
    }

    /// Reject settings the session manager cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!(
                "No signing secret configured. Set jwt_secret in {:?} or {}_JWT_SECRET.",
                Self::config_file_path(),
                ENV_PREFIX
            );
        }
        if self.token_issuer.trim().is_empty() {
            bail!("token_issuer must not be empty");
        }
        if self.access_token_ttl_secs == 0 || self.access_token_ttl_secs > MAX_ACCESS_TOKEN_TTL_SECS
        {
            bail!(
                "access_token_ttl_secs must be between 1 and {}",
                MAX_ACCESS_TOKEN_TTL_SECS
            );
        }
        if self.refresh_token_ttl_days == 0
            || self.refresh_token_ttl_days > MAX_REFRESH_TOKEN_TTL_DAYS
        {
            bail!(
                "refresh_token_ttl_days must be between 1 and {}",
                MAX_REFRESH_TOKEN_TTL_DAYS
            );
        }
        if !self.min_password_entropy.is_finite() || self.min_password_entropy < 0.0 {
            bail!("min_password_entropy must be a non-negative number");
        }
        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with CHIRPY_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chirpy")
            .join("config.toml")
    }

    /// Get the path to the record store file
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("database.json")
    }

    /// Lifetime of access tokens
    pub fn access_token_ttl(&self) -> Duration {
        let secs = self.access_token_ttl_secs.min(MAX_ACCESS_TOKEN_TTL_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }

    /// Lifetime of refresh tokens
    pub fn refresh_token_ttl(&self) -> Duration {
        let days = self.refresh_token_ttl_days.min(MAX_REFRESH_TOKEN_TTL_DAYS);
        Duration::days(i64::try_from(days).unwrap_or(0))
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chirpy")
}

fn default_token_issuer() -> String {
    DEFAULT_TOKEN_ISSUER.to_string()
}

fn default_access_token_ttl_secs() -> u64 {
    60 * 60
}

fn default_refresh_token_ttl_days() -> u64 {
    60
}

fn default_min_password_entropy() -> f64 {
    28.0
}
