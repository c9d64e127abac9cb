//! Configuration validation.
//!
//! Serde handles syntax; this module checks that values make sense before a
//! config is accepted. All problems are reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use alloy::primitives::Address;

use crate::config::schema::BoardConfig;

/// A single semantic problem in a config.
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

/// Validate a parsed config.
pub fn validate_config(config: &BoardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.chain.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new(
            "chain.rpc_url",
            format!("invalid URL '{}': {}", config.chain.rpc_url, e),
        ));
    }

    for url in &config.chain.failover_urls {
        if url.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                "chain.failover_urls",
                format!("invalid URL '{}'", url),
            ));
        }
    }

    if config.chain.chain_id == 0 {
        errors.push(ValidationError::new("chain.chain_id", "must be non-zero"));
    }

    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }

    if config.contract.address.is_empty() {
        errors.push(ValidationError::new("contract.address", "is required"));
    } else if config.contract.address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "contract.address",
            format!("'{}' is not a valid address", config.contract.address),
        ));
    }

    if config.wallet.private_key_env.trim().is_empty() {
        errors.push(ValidationError::new("wallet.private_key_env", "must name an environment variable"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
