//! Command enum for the engine actor
//!
//! Input events are fire-and-forget; queries carry a oneshot for the answer.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use super::gate::ReadReply;
use super::types::{MuteStatus, Volume};
use super::EngineTimings;

/// Point-in-time view of the engine, for diagnostics and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSnapshot {
    pub volume: Volume,
    pub mute: MuteStatus,
    /// A backend write is running or queued
    pub write_pending: bool,
    /// Ticks accumulated but not yet flushed
    pub pending_ticks: i64,
    pub sessions: usize,
    pub polling: bool,
    pub writes_issued: u64,
    pub reads_issued: u64,
}

#[derive(Debug)]
pub enum EngineCommand {
    // =========================================================================
    // Session lifecycle
    // =========================================================================
    Register {
        session: String,
        settings: Value,
    },
    Unregister {
        session: String,
    },
    UpdateConfig {
        session: String,
        settings: Value,
    },

    // =========================================================================
    // User input
    // =========================================================================
    Rotate {
        session: String,
        ticks: i64,
        /// Step carried by the event itself, overriding the stored one
        step_override: Option<Value>,
    },
    ToggleMute {
        session: String,
    },
    SetVolume {
        target: i64,
    },

    // =========================================================================
    // Queries and control
    // =========================================================================
    ReadVolume {
        response: ReadReply,
    },
    Snapshot {
        response: oneshot::Sender<EngineSnapshot>,
    },
    UpdateTimings(EngineTimings),
    Shutdown,
}
