use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rsmux_frame::{WellKnownMimeType, DEFAULT_MAX_FRAME_SIZE};

use crate::reconnect::{ReconnectPolicy, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY};
use crate::serializer::{IdentitySerializer, MetadataSerializer, Serializer};
use crate::token::TokenSource;

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_millis(60_000);
pub const DEFAULT_LIFETIME: Duration = Duration::from_millis(180_000);

/// Client settings. [`ClientConfig::new`] fills in the defaults.
#[derive(Clone)]
pub struct ClientConfig {
    /// Endpoint: `ws://`, `wss://` or `tcp://`.
    pub url: String,
    pub data_serializer: Arc<dyn Serializer>,
    /// Applied to composed metadata on SETUP and every request. Default: identity.
    pub metadata_serializer: Arc<dyn MetadataSerializer>,
    /// Interval between client KEEPALIVE frames. Default: 60 s.
    pub keep_alive: Duration,
    /// Silence after which the connection is considered dead. Default: 180 s.
    pub lifetime: Duration,
    /// Default: `application/json`.
    pub data_mime_type: String,
    /// Default: `message/x.rsocket.composite-metadata.v0`.
    pub metadata_mime_type: String,
    /// Default: 5.
    pub max_reconnect_attempts: u32,
    /// Default: 2 s.
    pub reconnect_delay: Duration,
    pub max_frame_size: usize,
    /// Default token for SETUP and for calls without their own token.
    pub token: Option<TokenSource>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            data_serializer: Arc::new(IdentitySerializer),
            metadata_serializer: Arc::new(IdentitySerializer),
            keep_alive: DEFAULT_KEEP_ALIVE,
            lifetime: DEFAULT_LIFETIME,
            data_mime_type: WellKnownMimeType::ApplicationJson.as_str().to_string(),
            metadata_mime_type: WellKnownMimeType::MessageCompositeMetadata
                .as_str()
                .to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            token: None,
        }
    }

    pub fn with_serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.data_serializer = Arc::new(serializer);
        self
    }

    pub fn with_metadata_serializer(
        mut self,
        serializer: impl MetadataSerializer + 'static,
    ) -> Self {
        self.metadata_serializer = Arc::new(serializer);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_data_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.data_mime_type = mime_type.into();
        self
    }

    pub fn with_metadata_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.metadata_mime_type = mime_type.into();
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_token(mut self, token: impl Into<TokenSource>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            delay: self.reconnect_delay,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("data_serializer", &self.data_serializer.name())
            .field("metadata_serializer", &self.metadata_serializer.name())
            .field("keep_alive", &self.keep_alive)
            .field("lifetime", &self.lifetime)
            .field("data_mime_type", &self.data_mime_type)
            .field("metadata_mime_type", &self.metadata_mime_type)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("max_frame_size", &self.max_frame_size)
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::JsonSerializer;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("ws://localhost:7000");
        assert_eq!(config.keep_alive, Duration::from_secs(60));
        assert_eq!(config.lifetime, Duration::from_secs(180));
        assert_eq!(config.data_mime_type, "application/json");
        assert_eq!(
            config.metadata_mime_type,
            "message/x.rsocket.composite-metadata.v0"
        );
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay, Duration::from_millis(2000));
        assert_eq!(config.data_serializer.name(), "identity");
        assert_eq!(config.metadata_serializer.name(), "identity");
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("tcp://127.0.0.1:7000")
            .with_serializer(JsonSerializer)
            .with_max_reconnect_attempts(3)
            .with_reconnect_delay(Duration::from_millis(50))
            .with_token("secret-token");
        assert_eq!(config.data_serializer.name(), "json");
        assert_eq!(
            config.reconnect_policy(),
            ReconnectPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new("ws://x").with_token("secret-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("redacted"));
    }
}
