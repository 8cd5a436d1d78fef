//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(&'static str),

    #[error("Reconnect backoff minimum must be positive and not exceed the maximum")]
    InvalidBackoff,

    #[error("Invalid auth endpoint URL")]
    InvalidAuthEndpoint,

    #[error("Invalid channel prefix: {0}")]
    InvalidChannelPrefix(&'static str),

    #[error("Invalid card moved label")]
    InvalidEventLabel,

    #[error("Invalid log level directive")]
    InvalidLogLevel,
}
