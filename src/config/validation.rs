//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All errors are reported, not
//! just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BootConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("lifecycle.ready_timeout_ms must be greater than zero")]
    ZeroReadyTimeout,

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
}

pub fn validate_config(config: &BootConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.lifecycle.ready_timeout_ms == 0 {
        errors.push(ValidationError::ZeroReadyTimeout);
    }

    if config.server.enabled {
        check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BootConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = BootConfig::default();
        config.lifecycle.ready_timeout_ms = 0;
        config.server.bind_address = "nowhere".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "also nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], ValidationError::ZeroReadyTimeout);
    }

    #[test]
    fn test_disabled_server_address_not_checked() {
        let mut config = BootConfig::default();
        config.server.enabled = false;
        config.server.bind_address = String::new();
        assert!(validate_config(&config).is_ok());
    }
}
