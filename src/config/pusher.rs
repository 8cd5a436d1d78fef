//! Pusher connection configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Pusher protocol revision spoken by the client
pub const PROTOCOL_VERSION: u8 = 7;

/// Pusher-compatible WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PusherConfig {
    /// Application key (public)
    #[serde(default)]
    pub app_key: String,

    /// WebSocket host
    #[serde(default = "default_host")]
    pub host: String,

    /// WebSocket port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use `wss://` instead of `ws://`
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,

    /// Seconds of silence before the client pings the server
    #[serde(default = "default_activity_timeout")]
    pub activity_timeout_secs: u64,

    /// Seconds to wait for any traffic after a ping before reconnecting
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,

    /// First reconnect delay in milliseconds
    #[serde(default = "default_reconnect_min")]
    pub reconnect_min_ms: u64,

    /// Reconnect delay cap in milliseconds
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,

    /// Endpoint signing private channel subscriptions
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,

    /// Bearer token sent to the auth endpoint
    #[serde(default)]
    pub auth_token: Option<Secret<String>>,

    /// Application secret; when set, private channels are signed locally
    #[serde(default)]
    pub app_secret: Option<Secret<String>>,
}

impl PusherConfig {
    /// WebSocket URL including the protocol query string
    pub fn websocket_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!(
            "{}://{}:{}/app/{}?protocol={}&client=board-realtime&version={}&flash=false",
            scheme,
            self.host,
            self.port,
            self.app_key,
            PROTOCOL_VERSION,
            env!("CARGO_PKG_VERSION"),
        )
    }

    pub fn activity_timeout(&self) -> Duration {
        Duration::from_secs(self.activity_timeout_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    pub fn reconnect_min(&self) -> Duration {
        Duration::from_millis(self.reconnect_min_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }

    /// Exposes the app secret, if configured and non-empty
    pub fn app_secret(&self) -> Option<&str> {
        self.app_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.is_empty())
    }

    /// Validate Pusher configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.app_key.is_empty() {
            return Err(ValidationError::MissingRequired("PUSHER__APP_KEY"));
        }
        if self.host.is_empty() {
            return Err(ValidationError::MissingRequired("PUSHER__HOST"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.activity_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("activity_timeout_secs"));
        }
        if self.pong_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("pong_timeout_secs"));
        }
        if self.reconnect_min_ms == 0 || self.reconnect_min_ms > self.reconnect_max_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        if !self.auth_endpoint.starts_with("http://") && !self.auth_endpoint.starts_with("https://")
        {
            return Err(ValidationError::InvalidAuthEndpoint);
        }
        Ok(())
    }
}

impl Default for PusherConfig {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            host: default_host(),
            port: default_port(),
            use_tls: default_use_tls(),
            activity_timeout_secs: default_activity_timeout(),
            pong_timeout_secs: default_pong_timeout(),
            reconnect_min_ms: default_reconnect_min(),
            reconnect_max_ms: default_reconnect_max(),
            auth_endpoint: default_auth_endpoint(),
            auth_token: None,
            app_secret: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6001
}

fn default_use_tls() -> bool {
    false
}

fn default_activity_timeout() -> u64 {
    120
}

fn default_pong_timeout() -> u64 {
    30
}

fn default_reconnect_min() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}

fn default_auth_endpoint() -> String {
    "http://127.0.0.1:8000/broadcasting/auth".to_string()
}
