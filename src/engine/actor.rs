//! VolumeActor - owner of all engine state
//!
//! Every input event, timer fire and backend completion is handled here, one
//! at a time, so no intermediate state is ever observed half-updated.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         VolumeActor                          │
//! │  state: VolumeState         sessions: SessionRegistry        │
//! │  accumulator + flush_timer  poll_timer                       │
//! │  gate: BackendGate ──spawn──► backend call ─┐                │
//! │        ▲                                    │ GateEvent      │
//! │        └──────────── gate_rx ◄──────────────┘                │
//! │                          ▲                                   │
//! │  command_rx (UnboundedReceiver<EngineCommand>)               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::accumulator::RotationAccumulator;
use super::actor_handle::VolumeActorHandle;
use super::commands::{EngineCommand, EngineSnapshot};
use super::feedback::FeedbackBroadcaster;
use super::gate::{BackendGate, GateEvent};
use super::sessions::{coerce_step, SessionConfig, SessionRegistry};
use super::timer::Timer;
use super::types::{MuteStatus, VolumeState};
use super::EngineTimings;
use crate::backend::VolumeBackend;

pub struct VolumeActor {
    state: VolumeState,
    sessions: SessionRegistry,
    accumulator: RotationAccumulator,
    gate: BackendGate,
    broadcaster: FeedbackBroadcaster,

    /// Fires once per debounce window after the first tick of a burst
    flush_timer: Timer,
    /// Armed only while at least one session is registered
    poll_timer: Timer,
    timings: EngineTimings,

    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    gate_rx: mpsc::UnboundedReceiver<GateEvent>,
}

impl VolumeActor {
    /// Spawn the engine on the current runtime and return its handle
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (broadcaster, outbound_rx) = FeedbackBroadcaster::channel();
    /// let engine = VolumeActor::spawn(backend, EngineTimings::default(), broadcaster);
    /// engine.register("dial-1", json!({"step": 2}));
    /// ```
    pub fn spawn(
        backend: Arc<dyn VolumeBackend>,
        timings: EngineTimings,
        broadcaster: FeedbackBroadcaster,
    ) -> VolumeActorHandle {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let (gate_tx, gate_rx) = mpsc::unbounded_channel();

        let backend_name = backend.name().to_string();
        let actor = VolumeActor {
            state: VolumeState::new(),
            sessions: SessionRegistry::new(),
            accumulator: RotationAccumulator::new(),
            gate: BackendGate::new(backend, timings.call_timeout, gate_tx),
            broadcaster,
            flush_timer: Timer::new(),
            poll_timer: Timer::new(),
            timings,
            command_rx,
            gate_rx,
        };

        tokio::spawn(actor.run());

        info!(
            backend = %backend_name,
            debounce_ms = timings.debounce.as_millis() as u64,
            poll_ms = timings.poll_interval.as_millis() as u64,
            "VolumeActor spawned"
        );

        VolumeActorHandle::new(cmd_tx)
    }

    async fn run(mut self) {
        debug!("VolumeActor run loop started");

        loop {
            let flush_due = self.flush_timer.expired();
            let poll_due = self.poll_timer.expired();

            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(EngineCommand::Shutdown) => {
                        info!("VolumeActor received shutdown command");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = self.gate_rx.recv() => self.handle_gate_event(event),
                _ = flush_due => self.flush_rotation(),
                _ = poll_due => self.poll_tick(),
            }
        }

        info!(
            writes = self.gate.writes_issued(),
            reads = self.gate.reads_issued(),
            "VolumeActor run loop terminated"
        );
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        trace!(?cmd, "Processing command");

        match cmd {
            EngineCommand::Register { session, settings } => {
                self.handle_register(session, &settings);
            }
            EngineCommand::Unregister { session } => {
                self.handle_unregister(&session);
            }
            EngineCommand::UpdateConfig { session, settings } => {
                let config = SessionConfig::from_settings(&settings);
                if self.sessions.update_config(&session, config) {
                    debug!(session = %session, step = config.step, "Session config updated");
                } else {
                    debug!(session = %session, "Config update for unknown session ignored");
                }
            }
            EngineCommand::Rotate {
                session,
                ticks,
                step_override,
            } => {
                self.handle_rotate(&session, ticks, step_override.as_ref());
            }
            EngineCommand::ToggleMute { session } => {
                self.handle_toggle_mute(&session);
            }
            EngineCommand::SetVolume { target } => {
                let target = self.state.apply_target(target);
                info!("🎚️  Volume set to {}%", target);
                self.gate.request_write(target);
                self.broadcast();
            }
            EngineCommand::ReadVolume { response } => {
                self.gate.request_read(Some(response));
            }
            EngineCommand::Snapshot { response } => {
                let _ = response.send(self.snapshot());
            }
            EngineCommand::UpdateTimings(timings) => {
                self.apply_timings(timings);
            }
            // Handled by the run loop
            EngineCommand::Shutdown => {}
        }
    }

    // =========================================================================
    // Sessions and poller lifecycle
    // =========================================================================

    fn handle_register(&mut self, session: String, settings: &Value) {
        let config = SessionConfig::from_settings(settings);
        let first = self.sessions.register(&session, config);

        if first {
            info!("▶️  First session active, starting volume poller");
            self.poll_timer.arm(self.timings.poll_interval);
            self.gate.request_read(None);
        }

        // Don't leave a fresh dial blank while waiting for the next change
        self.broadcaster.send_to(&session, &self.state);
    }

    fn handle_unregister(&mut self, session: &str) {
        if self.sessions.unregister(session) {
            info!("⏹️  Last session gone, stopping volume poller");
            self.poll_timer.disarm();
        }
    }

    fn poll_tick(&mut self) {
        if self.sessions.is_empty() {
            self.poll_timer.disarm();
            return;
        }
        self.poll_timer.arm(self.timings.poll_interval);
        trace!("Poll tick");
        self.gate.request_read(None);
    }

    // =========================================================================
    // User input
    // =========================================================================

    fn handle_rotate(&mut self, session: &str, ticks: i64, step_override: Option<&Value>) {
        let step = match step_override {
            Some(raw) => coerce_step(Some(raw)),
            None => self.sessions.step_for(session),
        };

        self.accumulator.accumulate(ticks, step);
        if self.flush_timer.arm_if_idle(self.timings.debounce) {
            trace!(session, ticks, step, "Rotation burst started");
        }
    }

    fn flush_rotation(&mut self) {
        self.flush_timer.disarm();

        let Some(delta) = self.accumulator.take_delta() else {
            trace!("Rotation burst cancelled out");
            return;
        };

        let target = self.state.rotate(delta);
        info!("🎛️  Rotation {:+} → {}%", delta, target);
        self.gate.request_write(target);
        self.broadcast();
    }

    fn handle_toggle_mute(&mut self, session: &str) {
        match self.state.toggle_mute() {
            Some(target) => {
                match self.state.mute() {
                    MuteStatus::Muted(restore) => info!("🔇 Muted (restore level {}%)", restore),
                    MuteStatus::Unmuted => info!("🔈 Unmuted → {}%", target),
                }
                self.gate.request_write(target);
                self.broadcast();
            }
            None => debug!(session, "Mute toggle ignored (silent or unknown volume)"),
        }
    }

    // =========================================================================
    // Backend completions
    // =========================================================================

    fn handle_gate_event(&mut self, event: GateEvent) {
        match event {
            GateEvent::WriteDone { target, result } => {
                self.gate.on_write_done(target, &result);
                if let Err(e) = result {
                    self.broadcaster
                        .diagnostic(format!("volume write {} failed: {}", target, e));
                }
            }
            GateEvent::ReadDone { epoch, result } => {
                let outcome = self.gate.on_read_done(epoch, result);
                match outcome.result {
                    Ok(observed) if outcome.stale => {
                        debug!(observed, "Read overlapped a write, not reconciling");
                    }
                    Ok(observed) => self.reconcile(observed),
                    Err(e) => {
                        self.broadcaster
                            .diagnostic(format!("volume read failed: {}", e));
                    }
                }
            }
        }
    }

    fn reconcile(&mut self, observed: u8) {
        if self.state.absorb_external(observed) {
            info!("🔄 Backend volume is {}%, display updated", observed);
            self.broadcast();
        } else {
            trace!(observed, "Backend volume unchanged");
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn broadcast(&self) {
        self.broadcaster.broadcast(&self.state, &self.sessions);
    }

    fn apply_timings(&mut self, timings: EngineTimings) {
        if timings == self.timings {
            return;
        }

        self.timings = timings;
        self.gate.set_call_timeout(timings.call_timeout);
        if self.poll_timer.is_armed() {
            self.poll_timer.arm(timings.poll_interval);
        }
        info!(
            debounce_ms = timings.debounce.as_millis() as u64,
            poll_ms = timings.poll_interval.as_millis() as u64,
            timeout_ms = timings.call_timeout.as_millis() as u64,
            "Engine timings updated"
        );
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            volume: self.state.volume(),
            mute: self.state.mute(),
            write_pending: self.gate.is_write_pending(),
            pending_ticks: self.accumulator.pending_ticks(),
            sessions: self.sessions.len(),
            polling: self.poll_timer.is_armed(),
            writes_issued: self.gate.writes_issued(),
            reads_issued: self.gate.reads_issued(),
        }
    }
}
