//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All errors are
//! collected rather than stopping at the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let bind = config.listener.bind_address.trim();
    if bind.is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    } else if bind.parse::<SocketAddr>().is_err() && !bind.contains(':') {
        // Host names are resolved by the listener; only require a port.
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a host:port address", bind),
        ));
    }

    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
    }

    if config.http.body_limit_bytes == 0 {
        errors.push(ValidationError::new("http.body_limit_bytes", "must be greater than 0"));
    }

    if config.logging.filter.trim().is_empty() {
        errors.push(ValidationError::new("logging.filter", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
