//! Volume engine - coalesces dial input into serialized backend commands
//!
//! The engine is an actor: one task owns the volume/mute state, the session
//! registry, the rotation accumulator and the backend gate, and processes
//! input commands, timer fires and backend completions one at a time. Nothing
//! is locked; ordering is the correctness mechanism (the poller never touches
//! the state while a write is outstanding).
//!
//! ```text
//! host event ─► Rotate ─► accumulator ─(debounce)─► state.rotate ─┐
//!            └► ToggleMute ─────────────────────► state.toggle ──┤
//!                                                                ├─► gate.write ─► backend
//!                                                                └─► broadcast ─► sessions
//! poll timer ─► gate.read ─► (no write outstanding) state.absorb ─► broadcast
//! ```

use std::time::Duration;

mod accumulator;
mod actor;
mod actor_handle;
mod commands;
mod feedback;
mod gate;
mod sessions;
mod timer;
mod types;


pub use actor::VolumeActor;
pub use actor_handle::VolumeActorHandle;
pub use commands::{EngineCommand, EngineSnapshot};
pub use feedback::{FeedbackBroadcaster, Outbound};
pub use sessions::{DEFAULT_STEP, MAX_STEP};
pub use types::{Display, MuteStatus, Volume, VolumeState, UNKNOWN_BASELINE};

/// Default rotation debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Default reconciliation poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default per-call backend timeout in milliseconds
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 3000;

/// Timing knobs of the engine (hot-reloadable)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimings {
    /// Window over which dial ticks are coalesced
    pub debounce: Duration,
    /// Interval between reconciliation reads while sessions are active
    pub poll_interval: Duration,
    /// Upper bound on any single backend call
    pub call_timeout: Duration,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}
