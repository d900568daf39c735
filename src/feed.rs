//! Heart-rate feed
//!
//! This module wraps the biometric provider's query/subscription mechanics
//! into a session-scoped feed. While active, raw reading batches arrive via
//! the event queue and are reduced to single samples; inactive, the feed
//! emits nothing.

use crate::error::RelayError;
use crate::types::HeartRateSample;
use chrono::{DateTime, Utc};
use tracing::debug;

/// The external biometric data source.
///
/// Authorization and stream setup go through this trait; delivered sample
/// batches do not: the provider pushes them onto the relay's event queue
/// from its own execution context.
pub trait BiometricProvider {
    /// Whether the platform has health data at all
    fn is_available(&self) -> bool;

    /// Request read authorization for heart-rate data
    fn request_authorization(&mut self) -> Result<(), RelayError>;

    /// Start the initial query plus continuous update subscription for
    /// readings taken at or after `since`
    fn begin_stream(&mut self, since: DateTime<Utc>) -> Result<(), RelayError>;

    /// Tear down the update subscription
    fn end_stream(&mut self);
}

/// A live sequence of heart-rate samples scoped to one session.
///
/// At most one stream is ever active; `start` while active is a no-op and a
/// fresh session requires `stop` first. Restarting yields a feed unaffected
/// by samples delivered before the stop.
#[derive(Debug)]
pub struct HeartRateFeed<P> {
    provider: P,
    active_since: Option<DateTime<Utc>>,
}

impl<P: BiometricProvider> HeartRateFeed<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            active_since: None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Start streaming readings taken at or after `session_start`.
    ///
    /// Fails with `CapabilityUnavailable` or `PermissionDenied` from the
    /// provider; the caller must not treat the feed as active on failure.
    pub fn start(&mut self, session_start: DateTime<Utc>) -> Result<(), RelayError> {
        if self.active_since.is_some() {
            return Ok(());
        }
        self.provider.begin_stream(session_start)?;
        self.active_since = Some(session_start);
        debug!(since = %session_start, "heart rate feed started");
        Ok(())
    }

    /// Cancel the subscription. Idempotent; safe when not started.
    pub fn stop(&mut self) {
        if self.active_since.take().is_some() {
            self.provider.end_stream();
            debug!("heart rate feed stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    /// Reduce a delivered batch to at most one sample.
    ///
    /// Policy: **latest-wins**. The batch collapses to its most recent
    /// sample, intentionally dropping older readings delivered alongside it.
    /// Readings taken before the session start are discarded, and an
    /// inactive feed yields nothing regardless of input.
    pub fn accept_batch(&self, batch: &[HeartRateSample]) -> Option<HeartRateSample> {
        let since = self.active_since?;
        batch
            .iter()
            .filter(|sample| sample.timestamp >= since)
            .max_by_key(|sample| sample.timestamp)
            .copied()
    }
}
