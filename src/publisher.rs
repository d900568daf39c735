//! Sample publisher
//!
//! This module wraps the pub/sub transport: connect once, subscribe once
//! with presence, and publish one textual payload per sample.

use crate::error::RelayError;
use crate::types::HeartRateSample;
use tracing::{debug, warn};

/// The external pub/sub transport client.
pub trait Transport {
    /// Establish the client with a stable per-device peer identity
    fn connect(&mut self, identity: &str) -> Result<(), RelayError>;

    /// Subscribe to a channel, optionally announcing presence
    fn subscribe(&mut self, channel: &str, with_presence: bool) -> Result<(), RelayError>;

    /// Send a payload to a channel
    fn publish(&mut self, channel: &str, payload: &str) -> Result<(), RelayError>;
}

/// Delivers heart-rate samples to a fixed channel, fire-and-forget.
///
/// The connect-once lifecycle guard lives here: the transport client is
/// created and subscribed exactly once per process lifetime, and later
/// `connect` calls are no-ops.
#[derive(Debug)]
pub struct Publisher<T> {
    transport: T,
    channel: String,
    established: bool,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T, channel: impl Into<String>) -> Self {
        Self {
            transport,
            channel: channel.into(),
            established: false,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the transport client has been established
    pub fn is_established(&self) -> bool {
        self.established
    }

    /// Establish the transport client and subscribe with presence enabled.
    ///
    /// Exactly one client per process lifetime: once established, further
    /// calls return immediately without touching the transport.
    pub fn connect(&mut self, identity: &str) -> Result<(), RelayError> {
        if self.established {
            return Ok(());
        }
        self.transport.connect(identity)?;
        self.transport.subscribe(&self.channel, true)?;
        self.established = true;
        debug!(channel = %self.channel, %identity, "transport established");
        Ok(())
    }

    /// Publish one sample as the decimal string of its bpm value.
    ///
    /// Policy: **fire-and-forget**. No acknowledgment is awaited and a
    /// transport error drops the message with a warning, no retry.
    pub fn publish(&mut self, sample: &HeartRateSample) {
        let payload = sample.bpm.to_string();
        if let Err(e) = self.transport.publish(&self.channel, &payload) {
            warn!(error = %e, payload, "publish dropped");
        }
    }
}
