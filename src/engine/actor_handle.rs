//! VolumeActorHandle - Public API for the VolumeActor
//!
//! Input methods are fire-and-forget so the host transport never waits on the
//! engine; queries await a oneshot reply.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::commands::{EngineCommand, EngineSnapshot};
use super::EngineTimings;
use crate::backend::BackendError;

/// Handle for interacting with the VolumeActor
///
/// # Hot Path Methods (fire-and-forget)
/// - `register` / `unregister` / `update_config` - session lifecycle
/// - `rotate` - relative dial ticks
/// - `toggle_mute` - press or tap
/// - `set_volume` - absolute target
///
/// # Query Methods (async with response)
/// - `read_volume` - read through the gate, sharing any in-flight read
/// - `snapshot` - current engine state
#[derive(Clone)]
pub struct VolumeActorHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
}

impl VolumeActorHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<EngineCommand>) -> Self {
        Self { cmd_tx }
    }

    // =========================================================================
    // Hot path methods (fire-and-forget, no await)
    // =========================================================================

    /// A display session became active with its initial settings
    pub fn register(&self, session: impl Into<String>, settings: Value) {
        let _ = self.cmd_tx.send(EngineCommand::Register {
            session: session.into(),
            settings,
        });
    }

    /// A display session went away
    pub fn unregister(&self, session: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Unregister {
            session: session.into(),
        });
    }

    /// A session's settings changed; never triggers a write or broadcast
    pub fn update_config(&self, session: impl Into<String>, settings: Value) {
        let _ = self.cmd_tx.send(EngineCommand::UpdateConfig {
            session: session.into(),
            settings,
        });
    }

    /// Relative rotation; `step_override` is the raw step carried by the event
    pub fn rotate(&self, session: impl Into<String>, ticks: i64, step_override: Option<Value>) {
        let _ = self.cmd_tx.send(EngineCommand::Rotate {
            session: session.into(),
            ticks,
            step_override,
        });
    }

    /// Discrete press or tap
    pub fn toggle_mute(&self, session: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::ToggleMute {
            session: session.into(),
        });
    }

    /// Absolute target (clamped to 0-100), exits mute
    pub fn set_volume(&self, target: i64) {
        let _ = self.cmd_tx.send(EngineCommand::SetVolume { target });
    }

    /// Apply new timings to the running engine
    pub fn update_timings(&self, timings: EngineTimings) {
        let _ = self.cmd_tx.send(EngineCommand::UpdateTimings(timings));
    }

    // =========================================================================
    // Query methods (async with response)
    // =========================================================================

    /// Read the backend volume through the gate
    pub async fn read_volume(&self) -> Result<u8, BackendError> {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = EngineCommand::ReadVolume {
            response: response_tx,
        };

        if self.cmd_tx.send(cmd).is_err() {
            return Err(BackendError::Unavailable);
        }

        response_rx.await.unwrap_or(Err(BackendError::Unavailable))
    }

    /// Current engine state; None once the actor has stopped
    pub async fn snapshot(&self) -> Option<EngineSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = EngineCommand::Snapshot {
            response: response_tx,
        };

        if self.cmd_tx.send(cmd).is_err() {
            return None;
        }

        response_rx.await.ok()
    }

    // =========================================================================
    // Lifecycle methods
    // =========================================================================

    /// Returns false if the command channel is closed.
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Signal the actor to shut down. In-flight backend calls are not cancelled.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<VolumeActorHandle>();
    }

    #[tokio::test]
    async fn test_queries_on_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = VolumeActorHandle::new(tx);

        assert!(!handle.is_alive());
        assert_eq!(handle.snapshot().await, None);
        assert_eq!(handle.read_volume().await, Err(BackendError::Unavailable));
    }
}
