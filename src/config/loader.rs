//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BootConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `lifecycle.ready_timeout_ms`.
pub const READY_TIMEOUT_ENV: &str = "READY_TIMEOUT_ENV";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name}={value:?} should be an integer number of milliseconds")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply the environment.
pub fn load_config(path: &Path) -> Result<BootConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BootConfig = toml::from_str(&content)?;
    finish(config)
}

/// Defaults plus environment, for running without a config file.
pub fn load_default() -> Result<BootConfig, ConfigError> {
    finish(BootConfig::default())
}

fn finish(mut config: BootConfig) -> Result<BootConfig, ConfigError> {
    let env = std::env::var(READY_TIMEOUT_ENV).ok();
    if let Some(timeout) = ready_timeout_from_env(env.as_deref())? {
        config.lifecycle.ready_timeout_ms = timeout;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse the readiness timeout override. `None` means unset; so does an
/// empty value.
pub fn ready_timeout_from_env(value: Option<&str>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv {
            name: READY_TIMEOUT_ENV,
            value: raw.to_string(),
        })
}
