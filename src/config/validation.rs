//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse every contract address and endpoint URL once, up front
//! - Validate value ranges (timeouts > 0, polling bounds ordered)
//!
//! Returns all validation errors, not just the first.

use alloy::primitives::Address;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }

    check_url(&mut errors, "chain.rpc_url", &config.chain.rpc_url);
    for (i, url) in config.chain.failover_urls.iter().enumerate() {
        check_url(&mut errors, &format!("chain.failover_urls[{}]", i), url);
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be > 0"));
    }
    if config.chain.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.receipt_timeout_secs", "must be > 0"));
    }
    if config.chain.receipt_poll_ms == 0 {
        errors.push(ValidationError::new("chain.receipt_poll_ms", "must be > 0"));
    }
    if config.chain.receipt_poll_max_ms < config.chain.receipt_poll_ms {
        errors.push(ValidationError::new(
            "chain.receipt_poll_max_ms",
            "must be >= chain.receipt_poll_ms",
        ));
    }

    check_address(&mut errors, "contracts.luca3auth", &config.contracts.luca3auth);
    check_address(&mut errors, "contracts.treasury", &config.contracts.treasury);
    check_address(&mut errors, "contracts.usdc", &config.contracts.usdc);

    check_url(&mut errors, "names.base_url", &config.names.base_url);
    if config.names.domain.is_empty() {
        errors.push(ValidationError::new("names.domain", "must not be empty"));
    }
    if !config.names.suffix.starts_with('.') {
        errors.push(ValidationError::new("names.suffix", "must start with '.'"));
    }

    check_url(&mut errors, "storage.upload_url", &config.storage.upload_url);
    check_url(&mut errors, "prices.url", &config.prices.url);

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }
    if config.sessions.max_sessions == 0 {
        errors.push(ValidationError::new("sessions.max_sessions", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if let Err(e) = value.parse::<url::Url>() {
        errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e)));
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<Address>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid address '{}'", value)));
    }
}
