//! Volume and mute state machine
//!
//! `VolumeState` is the single source of truth for what the dials display.
//! All transitions are synchronous and return the backend write they imply;
//! the actor is responsible for forwarding that write to the gate.

use serde::Serialize;

/// Baseline used when a rotation arrives before the first successful read
pub const UNKNOWN_BASELINE: u8 = 50;

/// Highest volume the backend accepts
pub const MAX_VOLUME: u8 = 100;

/// Opacity of the dial indicator while muted
pub const MUTED_OPACITY: f32 = 0.5;

/// Clamp any computed level into the backend's 0-100 range
pub fn clamp_volume(value: i64) -> u8 {
    value.clamp(0, MAX_VOLUME as i64) as u8
}

/// Output volume as last known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Volume {
    /// No successful read yet
    Unknown,
    Known(u8),
}

impl Volume {
    pub fn known(self) -> Option<u8> {
        match self {
            Volume::Known(v) => Some(v),
            Volume::Unknown => None,
        }
    }
}

/// Mute marker with the level to restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "restore")]
pub enum MuteStatus {
    Unmuted,
    Muted(u8),
}

/// What a dial shows for the current state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Display {
    /// Text on the dial, e.g. "56%" or "MUTED"
    pub text: String,
    /// Indicator bar value (0-100)
    pub indicator: u8,
    /// Indicator opacity, dimmed while muted
    pub opacity: f32,
    pub muted: bool,
}

/// Volume/mute state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeState {
    volume: Volume,
    mute: MuteStatus,
}

impl Default for VolumeState {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeState {
    /// Start in the unknown state, before any backend read
    pub fn new() -> Self {
        Self {
            volume: Volume::Unknown,
            mute: MuteStatus::Unmuted,
        }
    }

    /// Build a known state (mostly for tests and hydration from a read)
    pub fn known(volume: u8, mute: MuteStatus) -> Self {
        Self {
            volume: Volume::Known(volume.min(MAX_VOLUME)),
            mute,
        }
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn mute(&self) -> MuteStatus {
        self.mute
    }

    pub fn is_muted(&self) -> bool {
        matches!(self.mute, MuteStatus::Muted(_))
    }

    /// Toggle mute, returning the backend write it requires
    ///
    /// Muting at volume 0 and toggling an unknown volume are no-ops.
    pub fn toggle_mute(&mut self) -> Option<u8> {
        match (self.volume, self.mute) {
            (_, MuteStatus::Muted(restore)) => {
                self.volume = Volume::Known(restore);
                self.mute = MuteStatus::Unmuted;
                Some(restore)
            }
            (Volume::Known(current), MuteStatus::Unmuted) if current > 0 => {
                self.volume = Volume::Known(0);
                self.mute = MuteStatus::Muted(current);
                Some(0)
            }
            _ => None,
        }
    }

    /// Optimistically adopt a user-requested target; always exits mute
    pub fn apply_target(&mut self, target: i64) -> u8 {
        let clamped = clamp_volume(target);
        self.volume = Volume::Known(clamped);
        self.mute = MuteStatus::Unmuted;
        clamped
    }

    /// Apply a coalesced rotation delta and return the new target
    ///
    /// The delta is measured from the pre-mute level while muted, and from
    /// `UNKNOWN_BASELINE` when nothing has been read yet.
    pub fn rotate(&mut self, delta: i64) -> u8 {
        let baseline = match (self.mute, self.volume) {
            (MuteStatus::Muted(restore), _) => restore,
            (MuteStatus::Unmuted, Volume::Known(v)) => v,
            (MuteStatus::Unmuted, Volume::Unknown) => UNKNOWN_BASELINE,
        };
        self.apply_target((baseline as i64).saturating_add(delta))
    }

    /// Absorb a level observed on the backend; returns true if anything changed
    ///
    /// The caller must only pass readings taken while no write was outstanding.
    pub fn absorb_external(&mut self, observed: u8) -> bool {
        let observed = observed.min(MAX_VOLUME);
        let mut changed = false;

        if self.volume != Volume::Known(observed) {
            self.volume = Volume::Known(observed);
            changed = true;
        }

        if observed > 0 && self.is_muted() {
            self.mute = MuteStatus::Unmuted;
            changed = true;
        }

        changed
    }

    /// Project the state onto a dial display; nothing to show while unknown
    pub fn display(&self) -> Option<Display> {
        let volume = self.volume.known()?;
        Some(match self.mute {
            MuteStatus::Unmuted => Display {
                text: format!("{}%", volume),
                indicator: volume,
                opacity: 1.0,
                muted: false,
            },
            MuteStatus::Muted(_) => Display {
                text: "MUTED".to_string(),
                indicator: volume,
                opacity: MUTED_OPACITY,
                muted: true,
            },
        })
    }
}
