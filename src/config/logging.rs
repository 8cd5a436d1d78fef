//! Logging configuration

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::domain::realtime::DiagnosticsMode;

use super::error::ValidationError;

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Overrides the build-derived diagnostics mode
    #[serde(default)]
    pub diagnostics: Option<DiagnosticsMode>,
}

impl LoggingConfig {
    /// Diagnostics mode in effect: the override, else the build mode.
    pub fn mode(&self) -> DiagnosticsMode {
        self.diagnostics.unwrap_or_else(DiagnosticsMode::from_build)
    }

    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        EnvFilter::try_new(&self.level).map_err(|_| ValidationError::InvalidLogLevel)?;
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            diagnostics: None,
        }
    }
}

fn default_level() -> String {
    "board_realtime=info".to_string()
}
