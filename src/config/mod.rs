//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `BOARD_REALTIME` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use board_realtime::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Connecting to {}", config.pusher.websocket_url());
//! ```

mod channels;
mod error;
mod logging;
mod pusher;
mod session;

pub use channels::ChannelConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use pusher::{PusherConfig, PROTOCOL_VERSION};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Only `pusher.app_key` has no default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// WebSocket server connection and channel authorization
    #[serde(default)]
    pub pusher: PusherConfig,

    /// Channel prefixes and event labels
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Log filter, output format and diagnostics mode
    #[serde(default)]
    pub logging: LoggingConfig,

    /// User and board to open at start-up
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `BOARD_REALTIME` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `BOARD_REALTIME__PUSHER__APP_KEY=...` -> `pusher.app_key = ...`
    /// - `BOARD_REALTIME__CHANNELS__BOARD_PREFIX=project` -> `channels.board_prefix = "project"`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BOARD_REALTIME")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pusher.validate()?;
        self.channels.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::realtime::DiagnosticsMode;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("BOARD_REALTIME__PUSHER__APP_KEY", "app-key");
    }

    fn clear_env() {
        env::remove_var("BOARD_REALTIME__PUSHER__APP_KEY");
        env::remove_var("BOARD_REALTIME__PUSHER__PORT");
        env::remove_var("BOARD_REALTIME__PUSHER__USE_TLS");
        env::remove_var("BOARD_REALTIME__CHANNELS__BOARD_PREFIX");
        env::remove_var("BOARD_REALTIME__LOGGING__DIAGNOSTICS");
        env::remove_var("BOARD_REALTIME__SESSION__USER_ID");
        env::remove_var("BOARD_REALTIME__SESSION__BOARD_ID");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.pusher.app_key, "app-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.pusher.port, 6001);
        assert_eq!(config.channels.board_prefix, "board");
        assert_eq!(config.channels.card_moved_label, ".CardMoved");
        assert!(config.session.user_id.is_none());
    }

    #[test]
    fn test_missing_app_key_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("BOARD_REALTIME__PUSHER__PORT", "443");
        env::set_var("BOARD_REALTIME__PUSHER__USE_TLS", "true");
        env::set_var("BOARD_REALTIME__CHANNELS__BOARD_PREFIX", "project");
        env::set_var("BOARD_REALTIME__LOGGING__DIAGNOSTICS", "production");
        env::set_var("BOARD_REALTIME__SESSION__USER_ID", "5");
        env::set_var("BOARD_REALTIME__SESSION__BOARD_ID", "42");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.pusher.port, 443);
        assert!(config.pusher.use_tls);
        assert_eq!(config.channels.board_prefix, "project");
        assert_eq!(config.logging.mode(), DiagnosticsMode::Production);
        assert_eq!(config.session.user_id.unwrap().as_str(), "5");
        assert_eq!(config.session.board_id.unwrap().as_str(), "42");
    }

    #[test]
    fn test_invalid_board_id_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("BOARD_REALTIME__SESSION__BOARD_ID", "not a board");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
