//! Private channel authorizers.
//!
//! - `HttpChannelAuthorizer` asks the backend's `/broadcasting/auth` endpoint
//! - `SigningChannelAuthorizer` signs locally with the app secret

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::ports::{AuthorizationError, ChannelAuth, ChannelAuthorizer};

/// Configuration for the HTTP authorizer.
#[derive(Debug, Clone)]
pub struct HttpAuthorizerConfig {
    pub endpoint: String,
    pub token: Option<Secret<String>>,
    pub timeout: Duration,
}

impl HttpAuthorizerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: Secret<String>) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Authorizes channels by POSTing `socket_id` and `channel_name` as a form.
pub struct HttpChannelAuthorizer {
    config: HttpAuthorizerConfig,
    client: Client,
}

impl HttpChannelAuthorizer {
    pub fn new(config: HttpAuthorizerConfig) -> Result<Self, AuthorizationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthorizationError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChannelAuthorizer for HttpChannelAuthorizer {
    async fn authorize(
        &self,
        socket_id: &str,
        channel: &str,
    ) -> Result<ChannelAuth, AuthorizationError> {
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("Accept", "application/json")
            .form(&[("socket_id", socket_id), ("channel_name", channel)]);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AuthorizationError::Request(format!("timed out after {:?}", self.config.timeout))
            } else if e.is_connect() {
                AuthorizationError::Request(format!("Connection failed: {}", e))
            } else {
                AuthorizationError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(channel, status = status.as_u16(), "Channel authorization rejected");
            return Err(AuthorizationError::Rejected {
                channel: channel.to_string(),
                status: status.as_u16(),
            });
        }

        let auth: ChannelAuth = response
            .json()
            .await
            .map_err(|e| AuthorizationError::MalformedResponse(e.to_string()))?;
        if auth.auth.is_empty() {
            return Err(AuthorizationError::MalformedResponse(
                "empty auth field".to_string(),
            ));
        }
        Ok(auth)
    }
}

/// Signs channels locally: `<key>:hex(HMAC-SHA256(secret, "<socket_id>:<channel>"))`.
pub struct SigningChannelAuthorizer {
    app_key: String,
    secret: Secret<String>,
}

impl SigningChannelAuthorizer {
    pub fn new(app_key: impl Into<String>, secret: Secret<String>) -> Self {
        Self {
            app_key: app_key.into(),
            secret,
        }
    }

    fn mac(&self, socket_id: &str, channel: &str) -> Result<Vec<u8>, AuthorizationError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthorizationError::InvalidSignature)?;
        mac.update(format!("{}:{}", socket_id, channel).as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Hex-encoded signature for the pair.
    pub fn sign(&self, socket_id: &str, channel: &str) -> Result<String, AuthorizationError> {
        Ok(hex::encode(self.mac(socket_id, channel)?))
    }

    /// Checks an `auth` value in constant time.
    pub fn verify(
        &self,
        socket_id: &str,
        channel: &str,
        auth: &str,
    ) -> Result<(), AuthorizationError> {
        let (key, signature) = auth
            .split_once(':')
            .ok_or(AuthorizationError::InvalidSignature)?;
        if key != self.app_key {
            return Err(AuthorizationError::InvalidSignature);
        }
        let provided = hex::decode(signature).map_err(|_| AuthorizationError::InvalidSignature)?;
        let expected = self.mac(socket_id, channel)?;
        if constant_time_compare(&expected, &provided) {
            Ok(())
        } else {
            Err(AuthorizationError::InvalidSignature)
        }
    }
}

#[async_trait]
impl ChannelAuthorizer for SigningChannelAuthorizer {
    async fn authorize(
        &self,
        socket_id: &str,
        channel: &str,
    ) -> Result<ChannelAuth, AuthorizationError> {
        Ok(ChannelAuth {
            auth: format!("{}:{}", self.app_key, self.sign(socket_id, channel)?),
            channel_data: None,
        })
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> SigningChannelAuthorizer {
        SigningChannelAuthorizer::new("app-key", Secret::new("app-secret".to_string()))
    }

    #[tokio::test]
    async fn signed_auth_has_key_prefix_and_hex_signature() {
        let auth = signer()
            .authorize("1234.5678", "private-App.Models.User.5")
            .await
            .unwrap();

        let (key, signature) = auth.auth.split_once(':').unwrap();
        assert_eq!(key, "app-key");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(auth.channel_data.is_none());
    }

    #[tokio::test]
    async fn signature_verifies() {
        let signer = signer();
        let auth = signer.authorize("1.2", "private-x").await.unwrap();
        assert!(signer.verify("1.2", "private-x", &auth.auth).is_ok());
    }

    #[tokio::test]
    async fn signature_is_bound_to_socket_and_channel() {
        let signer = signer();
        let auth = signer.authorize("1.2", "private-x").await.unwrap();

        assert!(signer.verify("1.3", "private-x", &auth.auth).is_err());
        assert!(signer.verify("1.2", "private-y", &auth.auth).is_err());
    }

    #[test]
    fn verify_rejects_malformed_values() {
        let signer = signer();
        assert!(signer.verify("1.2", "c", "no-colon").is_err());
        assert!(signer.verify("1.2", "c", "app-key:zz").is_err());
        let sig = signer.sign("1.2", "c").unwrap();
        assert!(signer.verify("1.2", "c", &format!("other-key:{}", sig)).is_err());
    }

    #[test]
    fn different_secrets_sign_differently() {
        let other = SigningChannelAuthorizer::new("app-key", Secret::new("other".to_string()));
        assert_ne!(
            signer().sign("1.2", "c").unwrap(),
            other.sign("1.2", "c").unwrap()
        );
    }

    #[test]
    fn http_config_builder_works() {
        let config = HttpAuthorizerConfig::new("http://localhost/broadcasting/auth")
            .with_token(Secret::new("token".to_string()))
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.token.unwrap().expose_secret(), "token");
        assert!(HttpChannelAuthorizer::new(
            HttpAuthorizerConfig::new("http://localhost/broadcasting/auth")
        )
        .is_ok());
    }

    #[tokio::test]
    async fn http_authorizer_reports_unreachable_endpoint() {
        let authorizer = HttpChannelAuthorizer::new(
            HttpAuthorizerConfig::new("http://127.0.0.1:9/broadcasting/auth")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let result = authorizer.authorize("1.2", "private-x").await;

        assert!(matches!(result, Err(AuthorizationError::Request(_))));
    }
}
