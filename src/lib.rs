//! Pulsejump Relay - session/streaming core for live heart-rate relaying
//!
//! The relay streams a wearer's live heart rate to a remote pub/sub channel
//! for the duration of a tracked activity session and reflects connection
//! and activity status back to the user.
//!
//! ## Modules
//!
//! - **Controller**: the session state machine coordinating host, feed, and publisher
//! - **Feed**: session-scoped heart-rate sample acquisition with latest-wins reduction
//! - **Publisher**: connect-once transport wrapper with fire-and-forget publishing
//! - **Status**: connection tracking and the pure status-string projection
//! - **Runtime**: the serialized event queue all callback sources marshal onto

pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod publisher;
pub mod runtime;
pub mod status;
pub mod types;

pub use config::{generate_identity, RelayConfig, DEFAULT_CHANNEL, DEFAULT_IDENTITY};
pub use controller::{ActivitySessionHost, SessionController};
pub use error::RelayError;
pub use feed::{BiometricProvider, HeartRateFeed};
pub use publisher::{Publisher, Transport};
pub use runtime::{relay_channel, RelayHandle, RelayRuntime};
pub use status::{render_status, toggle_label, ConnectionStatusTracker, LOADING_STATUS};
pub use types::{
    ConnectionState, HeartRateSample, RelayEvent, SessionEvent, SessionState,
    TransportStatusEvent,
};

/// Relay version reported by the CLI and diagnostics
pub const RELAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for diagnostics
pub const PRODUCER_NAME: &str = "pulsejump-relay";
