//! Audio backends (system mixer commands, simulated mixer)
//!
//! A backend is the slow external control surface the engine talks to. It is
//! only ever reached through the engine's gate, which owns the concurrency
//! rules; implementations only have to perform one call at a time.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod command;
pub mod simulated;

pub use command::CommandBackend;
pub use simulated::SimulatedBackend;

/// Failure of a single backend call
///
/// Cloneable so one read outcome can be handed to every caller sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The call did not finish within the gate's call timeout
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend process could not be started
    #[error("failed to launch backend command: {0}")]
    Launch(String),

    /// The backend ran but reported a failure
    #[error("backend command failed: {0}")]
    Command(String),

    /// The backend answered with something that is not a volume
    #[error("unparsable backend output: {0:?}")]
    InvalidOutput(String),

    /// The engine owning the gate has stopped
    #[error("volume engine is not running")]
    Unavailable,
}

/// Backend trait - all volume integrations implement this
///
/// Note: Methods take &self to support Arc<dyn VolumeBackend>; calls are moved
/// onto spawned tasks by the gate.
#[async_trait]
pub trait VolumeBackend: Send + Sync {
    /// Get the backend name (e.g., "command", "simulated")
    fn name(&self) -> &str;

    /// Read the current output volume (0-100)
    async fn read(&self) -> Result<u8, BackendError>;

    /// Set the output volume (0-100)
    async fn write(&self, volume: u8) -> Result<(), BackendError>;
}
