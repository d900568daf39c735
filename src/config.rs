//! Relay configuration
//!
//! This module holds the static transport configuration: the two channel
//! keys, the channel name, and the device-scoped client identity. Keys are
//! fixed at process start; there is no rotation and no per-session scoping.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The pub/sub channel all heart-rate payloads go to
pub const DEFAULT_CHANNEL: &str = "heartrates";

/// Identity used when no device-scoped identity is available
pub const DEFAULT_IDENTITY: &str = "default";

/// Static configuration for the relay transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Publish key for the pub/sub transport
    pub publish_key: String,
    /// Subscribe key for the pub/sub transport
    pub subscribe_key: String,
    /// Channel name to publish samples to
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Stable device-scoped identity; `None` falls back to the fixed default
    #[serde(default)]
    pub device_identity: Option<String>,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

impl RelayConfig {
    /// Create a configuration with the default channel and no explicit identity
    pub fn new(publish_key: impl Into<String>, subscribe_key: impl Into<String>) -> Self {
        Self {
            publish_key: publish_key.into(),
            subscribe_key: subscribe_key.into(),
            channel: default_channel(),
            device_identity: None,
        }
    }

    /// The transport peer identity, falling back to the fixed default literal
    pub fn identity(&self) -> &str {
        self.device_identity.as_deref().unwrap_or(DEFAULT_IDENTITY)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.publish_key.is_empty() {
            return Err(RelayError::InvalidConfig("publish_key is empty".to_string()));
        }
        if self.subscribe_key.is_empty() {
            return Err(RelayError::InvalidConfig(
                "subscribe_key is empty".to_string(),
            ));
        }
        if self.channel.is_empty() {
            return Err(RelayError::InvalidConfig("channel is empty".to_string()));
        }
        Ok(())
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Generate a fresh device-scoped identity string.
///
/// The wearer's device normally supplies a vendor identifier; this helper
/// stands in for platforms that do not.
pub fn generate_identity() -> String {
    Uuid::new_v4().to_string()
}
