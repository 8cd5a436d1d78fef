//! Build-mode dependent diagnostics policy.

use serde::Deserialize;

/// Controls whether benign conditions (an event nobody handles) are reported.
///
/// Development builds warn; production builds stay silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsMode {
    Development,
    Production,
}

impl DiagnosticsMode {
    /// Debug builds map to `Development`, release builds to `Production`.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            DiagnosticsMode::Development
        } else {
            DiagnosticsMode::Production
        }
    }

    pub fn is_development(&self) -> bool {
        *self == DiagnosticsMode::Development
    }
}

impl Default for DiagnosticsMode {
    fn default() -> Self {
        Self::from_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_are_development() {
        // `cargo test` compiles with debug assertions unless --release is given.
        if cfg!(debug_assertions) {
            assert_eq!(DiagnosticsMode::from_build(), DiagnosticsMode::Development);
        } else {
            assert_eq!(DiagnosticsMode::from_build(), DiagnosticsMode::Production);
        }
    }

    #[test]
    fn deserializes_lowercase_names() {
        let mode: DiagnosticsMode = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(mode, DiagnosticsMode::Production);
        assert!(!mode.is_development());
    }
}
