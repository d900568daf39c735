//! Core types for the Pulsejump relay
//!
//! This module defines the data that flows through the relay: heart-rate
//! samples, the session and connection state enums, and the closed set of
//! events that may enter the serialized event queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped heart-rate reading.
///
/// Samples are immutable: the feed creates one per delivered reading and the
/// publisher consumes it exactly once. Nothing retains samples afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
    /// Beats per minute
    pub bpm: u32,
}

impl HeartRateSample {
    pub fn new(timestamp: DateTime<Utc>, bpm: u32) -> Self {
        Self { timestamp, bpm }
    }
}

/// Lifecycle state of the tracked activity session.
///
/// Owned exclusively by the session controller. The only reachable cycle is
/// Idle → Starting → Running → Ending → Idle; there is never more than one
/// active session at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Ending,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Ending => "ending",
        }
    }
}

/// Connectivity of the pub/sub transport as last reported by its status
/// stream. A transport that never reports stays `Connecting` indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Connecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
        }
    }
}

/// Session notifications from the activity session host.
///
/// A closed event set rather than an open callback surface: the host reports
/// exactly these three transitions and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The host confirmed the session entered its active/running phase
    Activated,
    /// The host reports the session has terminated
    Ended,
    /// The host reports an unrecoverable mid-session failure
    Failed { detail: String },
}

/// A raw connectivity notification from the transport's status stream.
///
/// The connectivity flag is optional on purpose: an event that decoded
/// without one is malformed and the status tracker treats it as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStatusEvent {
    /// Whether the transport considers itself connected
    #[serde(default)]
    pub connected: Option<bool>,
}

impl TransportStatusEvent {
    pub fn connected() -> Self {
        Self {
            connected: Some(true),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: Some(false),
        }
    }

    /// An undecodable status notification
    pub fn malformed() -> Self {
        Self { connected: None }
    }
}

/// Everything that may enter the relay's serialized event queue.
///
/// User intent, host notifications, sample deliveries, and transport status
/// all originate on their own execution contexts; they are marshaled onto
/// one queue and applied to shared state strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Presentation layer became active for the first time
    Activate,
    /// User pressed the start/stop control
    Toggle,
    /// Activity session host notification
    Session(SessionEvent),
    /// A batch of readings delivered by the biometric provider
    Samples { samples: Vec<HeartRateSample> },
    /// Transport connectivity notification
    TransportStatus(TransportStatusEvent),
    /// Stop draining the queue
    Shutdown,
}
