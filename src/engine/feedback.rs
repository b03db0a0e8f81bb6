//! Feedback broadcaster - pushes the displayable state to every session
//!
//! Messages leave the engine on a bounded channel drained by the host
//! transport. The engine never waits on the transport: a full channel drops
//! the message with a warning, the next state change resends everything.

use tokio::sync::mpsc;
use tracing::{trace, warn};

use super::sessions::SessionRegistry;
use super::types::{Display, VolumeState};

/// Capacity of the outbound channel created by `FeedbackBroadcaster::channel`
pub const OUTBOUND_CAPACITY: usize = 1000;

/// Message from the engine to the host
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// New display content for one session
    Feedback { session: String, display: Display },
    /// Diagnostic line for the host's log
    Diagnostic(String),
}

#[derive(Debug, Clone)]
pub struct FeedbackBroadcaster {
    tx: mpsc::Sender<Outbound>,
}

impl FeedbackBroadcaster {
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self { tx }
    }

    /// Create a broadcaster together with the receiving end for the transport
    pub fn channel() -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        (Self::new(tx), rx)
    }

    /// Push the current state to every registered session
    ///
    /// Returns the number of sessions addressed (0 while the volume is unknown).
    pub fn broadcast(&self, state: &VolumeState, sessions: &SessionRegistry) -> usize {
        let Some(view) = state.display() else {
            trace!("Volume unknown, nothing to broadcast");
            return 0;
        };

        let mut sent = 0;
        for session in sessions.ids() {
            self.push(Outbound::Feedback {
                session: session.to_string(),
                display: view.clone(),
            });
            sent += 1;
        }
        let text = view.text.as_str();
        trace!(sessions = sent, text, "Feedback broadcast");
        sent
    }

    /// Push the current state to a single session
    pub fn send_to(&self, session: &str, state: &VolumeState) -> bool {
        let Some(display) = state.display() else {
            return false;
        };
        self.push(Outbound::Feedback {
            session: session.to_string(),
            display,
        });
        true
    }

    /// Forward a diagnostic line to the host
    pub fn diagnostic(&self, message: impl Into<String>) {
        self.push(Outbound::Diagnostic(message.into()));
    }

    fn push(&self, message: Outbound) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(?message, "Outbound channel full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!("Outbound channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sessions::SessionConfig;
    use crate::engine::types::MuteStatus;

    #[tokio::test]
    async fn test_broadcast_reaches_every_session() {
        let (broadcaster, mut rx) = FeedbackBroadcaster::channel();
        let mut sessions = SessionRegistry::new();
        sessions.register("left", SessionConfig::default());
        sessions.register("right", SessionConfig::default());

        let state = VolumeState::known(56, MuteStatus::Unmuted);
        assert_eq!(broadcaster.broadcast(&state, &sessions), 2);

        let mut addressed = Vec::new();
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                Outbound::Feedback { session, display } => {
                    assert_eq!(display.text, "56%");
                    addressed.push(session);
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
        addressed.sort();
        assert_eq!(addressed, vec!["left", "right"]);
    }

    #[test]
    fn test_broadcast_with_trace_logging_enabled() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let (broadcaster, mut rx) = FeedbackBroadcaster::channel();
        let mut sessions = SessionRegistry::new();
        sessions.register("left", SessionConfig::default());

        let state = VolumeState::known(0, MuteStatus::Muted(30));
        let sent = tracing::subscriber::with_default(subscriber, || {
            broadcaster.broadcast(&state, &sessions)
        });

        assert_eq!(sent, 1);
        match rx.try_recv().unwrap() {
            Outbound::Feedback { session, display } => {
                assert_eq!(session, "left");
                assert_eq!(display.text, "MUTED");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_state_is_not_broadcast() {
        let (broadcaster, mut rx) = FeedbackBroadcaster::channel();
        let mut sessions = SessionRegistry::new();
        sessions.register("left", SessionConfig::default());

        assert_eq!(broadcaster.broadcast(&VolumeState::new(), &sessions), 0);
        assert!(!broadcaster.send_to("left", &VolumeState::new()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_channel_drops_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let broadcaster = FeedbackBroadcaster::new(tx);

        broadcaster.diagnostic("first");
        broadcaster.diagnostic("second");

        assert_eq!(rx.recv().await, Some(Outbound::Diagnostic("first".to_string())));
        assert!(rx.try_recv().is_err());
    }
}
