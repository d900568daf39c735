//! Connection tracking and status projection
//!
//! This module observes transport connectivity events and renders the single
//! user-visible status string. Rendering is a pure projection of session
//! state, connection state, and the last surfaced error; the presentation
//! layer recomputes it whenever any input changes.

use crate::error::RelayError;
use crate::types::{ConnectionState, SessionState, TransportStatusEvent};

/// Status shown before the presentation layer first activates the relay
pub const LOADING_STATUS: &str = "Loading...";

/// Tracks the transport's current connectivity.
///
/// Starts `Connecting`; a transport that never reports leaves it there
/// indefinitely. Only the most recent decodable event counts.
#[derive(Debug)]
pub struct ConnectionStatusTracker {
    state: ConnectionState,
}

impl Default for ConnectionStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatusTracker {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Apply one transport status event; returns whether the state changed.
    ///
    /// An event without a connectivity flag is malformed and ignored.
    pub fn observe(&mut self, event: &TransportStatusEvent) -> bool {
        let next = match event.connected {
            Some(true) => ConnectionState::Connected,
            Some(false) => ConnectionState::Disconnected,
            None => return false,
        };
        if next == self.state {
            return false;
        }
        self.state = next;
        true
    }
}

/// Render the user-visible status string.
///
/// An error dominates; otherwise the string composes a session part and a
/// connection part. Session failure detail is deliberately withheld: the
/// detail goes to the log, the wearer sees a generic message.
pub fn render_status(
    session: SessionState,
    connection: ConnectionState,
    last_error: Option<&RelayError>,
) -> String {
    if let Some(error) = last_error {
        return match error {
            RelayError::SessionFailure(_) => "Session failed".to_string(),
            other => other.to_string(),
        };
    }

    let session_part = match session {
        SessionState::Idle => "Idle",
        SessionState::Starting => "Starting session...",
        SessionState::Running => "Streaming heart rate",
        SessionState::Ending => "Ending session...",
    };
    let connection_part = match connection {
        ConnectionState::Connected => "connected",
        ConnectionState::Disconnected => "connection lost",
        ConnectionState::Connecting => "connecting...",
    };

    format!("{} ({})", session_part, connection_part)
}

/// Label for the start/stop control.
pub fn toggle_label(session: SessionState) -> &'static str {
    match session {
        SessionState::Starting | SessionState::Running => "Stop",
        SessionState::Idle | SessionState::Ending => "Start",
    }
}
