//! Session controller
//!
//! This module owns the session state machine. It reacts to user toggle
//! intents, activity-session host transitions, delivered sample batches,
//! and transport status, and keeps the feed and publisher in lockstep:
//! the feed is active iff the session is running, and a publish never
//! happens outside a running session.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::feed::{BiometricProvider, HeartRateFeed};
use crate::publisher::{Publisher, Transport};
use crate::status::{render_status, toggle_label, ConnectionStatusTracker, LOADING_STATUS};
use crate::types::{HeartRateSample, RelayEvent, SessionEvent, SessionState, TransportStatusEvent};
use chrono::{DateTime, Utc};
use tracing::{debug, error, trace, warn};

/// The external activity-session facility.
///
/// Begin/end are requests; the host confirms transitions asynchronously
/// through `SessionEvent` values on the relay's event queue.
pub trait ActivitySessionHost {
    /// Request a tracked activity session starting at `start`
    fn begin_session(&mut self, start: DateTime<Utc>) -> Result<(), RelayError>;

    /// Request the current session to end
    fn end_session(&mut self) -> Result<(), RelayError>;
}

/// Orchestrates one session/streaming cycle at a time.
///
/// The only reachable state cycle is Idle → Starting → Running → Ending →
/// Idle. Every state mutation happens on the serialized event queue; the
/// controller itself is single-threaded by construction.
pub struct SessionController<H, P, T> {
    host: H,
    feed: HeartRateFeed<P>,
    publisher: Publisher<T>,
    tracker: ConnectionStatusTracker,
    config: RelayConfig,
    state: SessionState,
    session_start: Option<DateTime<Utc>>,
    last_error: Option<RelayError>,
    activated: bool,
}

impl<H, P, T> SessionController<H, P, T>
where
    H: ActivitySessionHost,
    P: BiometricProvider,
    T: Transport,
{
    pub fn new(config: RelayConfig, host: H, provider: P, transport: T) -> Self {
        let publisher = Publisher::new(transport, config.channel.clone());
        Self {
            host,
            feed: HeartRateFeed::new(provider),
            publisher,
            tracker: ConnectionStatusTracker::new(),
            config,
            state: SessionState::Idle,
            session_start: None,
            last_error: None,
            activated: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&RelayError> {
        self.last_error.as_ref()
    }

    /// Apply one event from the serialized queue.
    pub fn dispatch(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Activate => self.activate(),
            RelayEvent::Toggle => self.toggle(),
            RelayEvent::Session(session_event) => self.handle_session_event(session_event),
            RelayEvent::Samples { samples } => self.handle_samples(&samples),
            RelayEvent::TransportStatus(status) => self.handle_transport_status(&status),
            RelayEvent::Shutdown => {}
        }
    }

    /// First activation of the presentation layer.
    ///
    /// Checks data availability, requests authorization, then establishes
    /// the transport. Runs at most once per process lifetime; later
    /// activations return immediately.
    pub fn activate(&mut self) {
        if self.activated {
            return;
        }
        self.activated = true;

        if !self.feed.provider().is_available() {
            // Terminal: the feature stays unusable, only the status shows it
            self.last_error = Some(RelayError::BiometricDataUnavailable);
            return;
        }

        if let Err(e) = self.feed.provider_mut().request_authorization() {
            warn!(error = %e, "heart rate authorization declined");
            self.last_error = Some(e);
            return;
        }

        let identity = self.config.identity().to_string();
        if let Err(e) = self.publisher.connect(&identity) {
            warn!(error = %e, "transport connect failed");
            self.last_error = Some(e);
        }
    }

    /// User pressed the start/stop control.
    ///
    /// Idle requests a session start, Running requests the end. Starting and
    /// Ending are explicit no-ops: the host has not confirmed the previous
    /// request yet and a second request must never be issued.
    pub fn toggle(&mut self) {
        self.toggle_at(Utc::now());
    }

    /// Toggle with an explicit session start instant.
    pub fn toggle_at(&mut self, now: DateTime<Utc>) {
        // Terminal errors leave the feature unusable: no session may ever
        // start and the surfaced status stays put.
        if matches!(&self.last_error, Some(e) if !e.is_recoverable()) {
            trace!("toggle ignored, feature unusable");
            return;
        }

        match self.state {
            SessionState::Idle => match self.host.begin_session(now) {
                Ok(()) => {
                    self.session_start = Some(now);
                    self.last_error = None;
                    self.state = SessionState::Starting;
                    debug!(start = %now, "session start requested");
                }
                Err(e) => {
                    error!(error = %e, "session start request failed");
                    self.last_error = Some(RelayError::SessionFailure(e.to_string()));
                }
            },
            SessionState::Running => match self.host.end_session() {
                Ok(()) => {
                    self.state = SessionState::Ending;
                    debug!("session end requested");
                }
                Err(e) => {
                    error!(error = %e, "session end request failed");
                    self.last_error = Some(RelayError::SessionFailure(e.to_string()));
                    self.force_idle();
                }
            },
            SessionState::Starting | SessionState::Ending => {
                trace!(state = self.state.as_str(), "toggle ignored mid-transition");
            }
        }
    }

    /// Activity-session host notification.
    ///
    /// The transition table is total: pairs not handled here are no-ops.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match (self.state, event) {
            (SessionState::Starting, SessionEvent::Activated) => {
                self.state = SessionState::Running;
                let start = self.session_start.unwrap_or_else(Utc::now);
                if let Err(e) = self.feed.start(start) {
                    // Sampling capability missing: fall back to ending the
                    // session, the same path as a user toggle-back.
                    warn!(error = %e, "feed start failed, ending session");
                    self.last_error = Some(e);
                    match self.host.end_session() {
                        Ok(()) => self.state = SessionState::Ending,
                        Err(end_err) => {
                            error!(error = %end_err, "fallback session end failed");
                            self.force_idle();
                        }
                    }
                }
            }
            (_, SessionEvent::Ended) => {
                debug!("session ended");
                self.force_idle();
            }
            (_, SessionEvent::Failed { detail }) => {
                // Detail goes to the log only; the wearer sees a generic
                // session-failed status.
                error!(%detail, "activity session failed");
                self.last_error = Some(RelayError::SessionFailure(detail));
                self.force_idle();
            }
            (_, SessionEvent::Activated) => {
                trace!(state = self.state.as_str(), "stray activation ignored");
            }
        }
    }

    /// A batch of readings delivered by the provider.
    ///
    /// Dropped entirely unless the session is running; otherwise the batch
    /// reduces latest-wins to one sample which is published exactly once.
    pub fn handle_samples(&mut self, batch: &[HeartRateSample]) {
        if self.state != SessionState::Running {
            trace!(
                state = self.state.as_str(),
                count = batch.len(),
                "sample batch dropped outside running session"
            );
            return;
        }
        if let Some(sample) = self.feed.accept_batch(batch) {
            self.publisher.publish(&sample);
        }
    }

    pub fn handle_transport_status(&mut self, event: &TransportStatusEvent) {
        if self.tracker.observe(event) {
            debug!(state = self.tracker.state().as_str(), "connection state changed");
        }
    }

    /// The user-visible status string for the current inputs.
    pub fn status(&self) -> String {
        if !self.activated {
            return LOADING_STATUS.to_string();
        }
        render_status(self.state, self.tracker.state(), self.last_error.as_ref())
    }

    /// Label for the start/stop control.
    pub fn toggle_label(&self) -> &'static str {
        toggle_label(self.state)
    }

    fn force_idle(&mut self) {
        self.feed.stop();
        self.session_start = None;
        self.state = SessionState::Idle;
    }
}
