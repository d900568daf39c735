//! Serialized execution context
//!
//! This module provides the single event queue all callback sources feed
//! into. User intent, host notifications, sample deliveries, and transport
//! status may originate on any thread; a `RelayHandle` marshals them onto
//! the queue and the runtime applies them to the controller strictly in
//! arrival order, so no two state mutations ever race.

use crate::controller::{ActivitySessionHost, SessionController};
use crate::feed::BiometricProvider;
use crate::publisher::Transport;
use crate::types::{HeartRateSample, RelayEvent, SessionEvent, TransportStatusEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

/// Create the relay's event queue.
pub fn relay_channel() -> (RelayHandle, Receiver<RelayEvent>) {
    let (tx, rx) = unbounded();
    (RelayHandle { tx }, rx)
}

/// Cheap cloneable sender side of the event queue.
///
/// Sending never blocks the caller. Once the runtime has shut down, sends
/// are dropped without error: delivery is disabled, not guaranteed.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: Sender<RelayEvent>,
}

impl RelayHandle {
    pub fn send(&self, event: RelayEvent) {
        if self.tx.send(event).is_err() {
            trace!("event dropped after runtime shutdown");
        }
    }

    pub fn activate(&self) {
        self.send(RelayEvent::Activate);
    }

    pub fn toggle(&self) {
        self.send(RelayEvent::Toggle);
    }

    pub fn session(&self, event: SessionEvent) {
        self.send(RelayEvent::Session(event));
    }

    pub fn samples(&self, samples: Vec<HeartRateSample>) {
        self.send(RelayEvent::Samples { samples });
    }

    pub fn transport_status(&self, event: TransportStatusEvent) {
        self.send(RelayEvent::TransportStatus(event));
    }

    pub fn shutdown(&self) {
        self.send(RelayEvent::Shutdown);
    }
}

/// Drains the event queue into the controller on one thread.
pub struct RelayRuntime<H, P, T> {
    controller: SessionController<H, P, T>,
    events: Receiver<RelayEvent>,
}

impl<H, P, T> RelayRuntime<H, P, T>
where
    H: ActivitySessionHost,
    P: BiometricProvider,
    T: Transport,
{
    pub fn new(controller: SessionController<H, P, T>, events: Receiver<RelayEvent>) -> Self {
        Self { controller, events }
    }

    /// Run until `Shutdown` arrives or every handle is dropped.
    ///
    /// `on_status` receives the status string on first launch and again
    /// whenever it changes after an event. Returns the controller so callers
    /// can inspect final state.
    pub fn run<F>(mut self, mut on_status: F) -> SessionController<H, P, T>
    where
        F: FnMut(&str),
    {
        let mut last_status = self.controller.status();
        on_status(&last_status);

        while let Ok(event) = self.events.recv() {
            let stop = matches!(event, RelayEvent::Shutdown);
            self.controller.dispatch(event);

            let status = self.controller.status();
            if status != last_status {
                on_status(&status);
                last_status = status;
            }

            if stop {
                break;
            }
        }

        self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::error::RelayError;
    use crate::types::SessionState;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::{Arc, Mutex};
    use std::thread;

    struct NullHost;

    impl ActivitySessionHost for NullHost {
        fn begin_session(&mut self, _start: DateTime<Utc>) -> Result<(), RelayError> {
            Ok(())
        }

        fn end_session(&mut self) -> Result<(), RelayError> {
            Ok(())
        }
    }

    struct OkProvider;

    impl BiometricProvider for OkProvider {
        fn is_available(&self) -> bool {
            true
        }
        fn request_authorization(&mut self) -> Result<(), RelayError> {
            Ok(())
        }
        fn begin_stream(&mut self, _since: DateTime<Utc>) -> Result<(), RelayError> {
            Ok(())
        }
        fn end_stream(&mut self) {}
    }

    #[derive(Clone, Default)]
    struct SharedTransport {
        published: Arc<Mutex<Vec<String>>>,
    }

    impl Transport for SharedTransport {
        fn connect(&mut self, _identity: &str) -> Result<(), RelayError> {
            Ok(())
        }
        fn subscribe(&mut self, _channel: &str, _presence: bool) -> Result<(), RelayError> {
            Ok(())
        }
        fn publish(&mut self, _channel: &str, payload: &str) -> Result<(), RelayError> {
            self.published.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_events_apply_in_arrival_order() {
        let (handle, events) = relay_channel();
        let transport = SharedTransport::default();
        let published = transport.published.clone();

        let controller = SessionController::new(
            RelayConfig::new("pk", "sk"),
            NullHost,
            OkProvider,
            transport,
        );
        let runtime = RelayRuntime::new(controller, events);

        let later = Utc.timestamp_opt(2_000_000_000, 0).unwrap();
        handle.activate();
        handle.toggle();
        handle.session(SessionEvent::Activated);
        handle.samples(vec![HeartRateSample::new(later, 80)]);
        handle.toggle();
        handle.session(SessionEvent::Ended);
        // Stale delivery after the session end publishes nothing
        handle.samples(vec![HeartRateSample::new(later, 95)]);
        handle.shutdown();

        let controller = runtime.run(|_| {});
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(*published.lock().unwrap(), vec!["80".to_string()]);
    }

    #[test]
    fn test_status_sink_only_sees_changes() {
        let (handle, events) = relay_channel();
        let controller = SessionController::new(
            RelayConfig::new("pk", "sk"),
            NullHost,
            OkProvider,
            SharedTransport::default(),
        );
        let runtime = RelayRuntime::new(controller, events);

        handle.activate();
        handle.transport_status(TransportStatusEvent::connected());
        // Duplicate connectivity reports must not re-render
        handle.transport_status(TransportStatusEvent::connected());
        handle.transport_status(TransportStatusEvent::malformed());
        handle.shutdown();

        let mut seen = Vec::new();
        runtime.run(|status| seen.push(status.to_string()));

        assert_eq!(
            seen,
            vec![
                "Loading...".to_string(),
                "Idle (connecting...)".to_string(),
                "Idle (connected)".to_string(),
            ]
        );
    }

    #[test]
    fn test_handles_marshal_from_other_threads() {
        let (handle, events) = relay_channel();
        let transport = SharedTransport::default();
        let published = transport.published.clone();

        let controller = SessionController::new(
            RelayConfig::new("pk", "sk"),
            NullHost,
            OkProvider,
            transport,
        );
        let runtime = RelayRuntime::new(controller, events);

        let sender = handle.clone();
        let producer = thread::spawn(move || {
            let later = Utc.timestamp_opt(2_000_000_000, 0).unwrap();
            sender.activate();
            sender.toggle();
            sender.session(SessionEvent::Activated);
            for bpm in [70, 71, 72] {
                sender.samples(vec![HeartRateSample::new(later, bpm)]);
            }
            sender.shutdown();
        });

        runtime.run(|_| {});
        producer.join().unwrap();

        assert_eq!(
            *published.lock().unwrap(),
            vec!["70".to_string(), "71".to_string(), "72".to_string()]
        );
    }

    #[test]
    fn test_run_ends_when_all_handles_drop() {
        let (handle, events) = relay_channel();
        let controller = SessionController::new(
            RelayConfig::new("pk", "sk"),
            NullHost,
            OkProvider,
            SharedTransport::default(),
        );
        let runtime = RelayRuntime::new(controller, events);

        handle.activate();
        drop(handle);

        let controller = runtime.run(|_| {});
        assert_eq!(controller.state(), SessionState::Idle);
    }
}
