//! Config command handlers

use anyhow::{bail, Context, Result};

use chirpy_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
///
/// Works before the configuration is complete; the signing secret is
/// never printed.
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load_unchecked().context("Failed to load configuration")?;
    let secret_state = if config.jwt_secret.trim().is_empty() {
        "(not set)"
    } else {
        "(set)"
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "jwt_secret": secret_state,
                    "token_issuer": config.token_issuer,
                    "access_token_ttl_secs": config.access_token_ttl_secs,
                    "refresh_token_ttl_days": config.refresh_token_ttl_days,
                    "min_password_entropy": config.min_password_entropy,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:               {}", config.data_dir.display());
            println!("  jwt_secret:             {}", secret_state);
            println!("  token_issuer:           {}", config.token_issuer);
            println!("  access_token_ttl_secs:  {}", config.access_token_ttl_secs);
            println!("  refresh_token_ttl_days: {}", config.refresh_token_ttl_days);
            println!("  min_password_entropy:   {}", config.min_password_entropy);
            println!(
                "  log_file:               {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value in the config file
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let path = Config::config_file_path();
    let mut config = Config::read_file(&path).context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "jwt_secret" => {
            config.jwt_secret = value.clone();
        }
        "token_issuer" => {
            config.token_issuer = value.clone();
        }
        "access_token_ttl_secs" => {
            config.access_token_ttl_secs = value
                .parse()
                .context("Invalid value for access_token_ttl_secs. Use a number of seconds.")?;
        }
        "refresh_token_ttl_days" => {
            config.refresh_token_ttl_days = value
                .parse()
                .context("Invalid value for refresh_token_ttl_days. Use a number of days.")?;
        }
        "min_password_entropy" => {
            config.min_password_entropy = value
                .parse()
                .context("Invalid value for min_password_entropy. Use a number of bits.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.clone().into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, jwt_secret, token_issuer, access_token_ttl_secs, \
                 refresh_token_ttl_days, min_password_entropy, log_file",
                key
            );
        }
    }

    config
        .save_to_path(&path)
        .context("Failed to save configuration")?;

    if key == "jwt_secret" {
        output.success("Set jwt_secret");
    } else {
        output.success(&format!("Set {} = {}", key, value));
    }

    Ok(())
}
