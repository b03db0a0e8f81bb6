//! Backend gate - the only path to the volume backend
//!
//! ## Writes
//! One write in flight at most, plus one queued target. A new target replaces
//! the queued one, so transient dial positions are dropped and only the latest
//! intent is guaranteed to reach the backend. Every completion (success,
//! failure or timeout) drains the queue again.
//!
//! ## Reads
//! Single-flight: while a read is running, further requests wait for the same
//! result instead of issuing another backend call.
//!
//! ## Stale reads
//! The write epoch is bumped each time a write starts. A read remembers the
//! epoch it was issued under; if a write started since, or one is still
//! pending when the read lands, the value may predate that write and must not
//! be reconciled into the state.
//!
//! Backend calls run on spawned tasks and report back through `GateEvent`s on
//! the actor's channel, so the gate's bookkeeping is only touched by the actor.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::backend::{BackendError, VolumeBackend};

/// Reply channel for callers awaiting a shared read
pub type ReadReply = oneshot::Sender<Result<u8, BackendError>>;

/// Completion of a backend call, delivered back to the actor
#[derive(Debug)]
pub enum GateEvent {
    WriteDone {
        target: u8,
        result: Result<(), BackendError>,
    },
    ReadDone {
        epoch: u64,
        result: Result<u8, BackendError>,
    },
}

/// Result of a completed read after fanning it out to waiters
#[derive(Debug)]
pub struct ReadOutcome {
    pub result: Result<u8, BackendError>,
    /// A write started or is pending since the read was issued
    pub stale: bool,
}

pub struct BackendGate {
    backend: Arc<dyn VolumeBackend>,
    call_timeout: Duration,
    events_tx: mpsc::UnboundedSender<GateEvent>,

    write_in_flight: bool,
    queued_target: Option<u8>,
    write_epoch: u64,

    read_in_flight: bool,
    read_waiters: Vec<ReadReply>,

    writes_issued: u64,
    reads_issued: u64,
}

impl BackendGate {
    pub fn new(
        backend: Arc<dyn VolumeBackend>,
        call_timeout: Duration,
        events_tx: mpsc::UnboundedSender<GateEvent>,
    ) -> Self {
        Self {
            backend,
            call_timeout,
            events_tx,
            write_in_flight: false,
            queued_target: None,
            write_epoch: 0,
            read_in_flight: false,
            read_waiters: Vec::new(),
            writes_issued: 0,
            reads_issued: 0,
        }
    }

    pub fn set_call_timeout(&mut self, timeout: Duration) {
        self.call_timeout = timeout;
    }

    /// A write is running or waiting in the queue
    pub fn is_write_pending(&self) -> bool {
        self.write_in_flight || self.queued_target.is_some()
    }

    #[cfg(test)]
    pub fn is_read_in_flight(&self) -> bool {
        self.read_in_flight
    }

    /// Total backend writes started (for diagnostics)
    pub fn writes_issued(&self) -> u64 {
        self.writes_issued
    }

    /// Total backend reads started (for diagnostics)
    pub fn reads_issued(&self) -> u64 {
        self.reads_issued
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Queue `target`, superseding any target that has not started yet
    pub fn request_write(&mut self, target: u8) {
        if let Some(superseded) = self.queued_target.replace(target) {
            trace!(superseded, volume = target, "Queued write superseded");
        }
        self.drain();
    }

    /// Start the queued write unless one is already running
    fn drain(&mut self) {
        if self.write_in_flight {
            return;
        }
        let Some(target) = self.queued_target.take() else {
            return;
        };

        self.write_in_flight = true;
        self.write_epoch += 1;
        self.writes_issued += 1;
        debug!(volume = target, epoch = self.write_epoch, "Backend write started");

        let backend = Arc::clone(&self.backend);
        let call_timeout = self.call_timeout;
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(call_timeout, backend.write(target)).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(call_timeout)),
            };
            let _ = events_tx.send(GateEvent::WriteDone { target, result });
        });
    }

    /// Record a finished write and move on to whatever was queued meanwhile
    pub fn on_write_done(&mut self, target: u8, result: &Result<(), BackendError>) {
        self.write_in_flight = false;

        match result {
            Ok(()) => debug!(volume = target, "Backend write completed"),
            Err(e) => warn!(volume = target, error = %e, "Backend write failed (dropped)"),
        }

        self.drain();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Join the in-flight read, or start one
    ///
    /// `reply` is None for internal requesters (the poller) that consume the
    /// result through `on_read_done`.
    pub fn request_read(&mut self, reply: Option<ReadReply>) {
        if let Some(reply) = reply {
            self.read_waiters.push(reply);
        }

        if self.read_in_flight {
            trace!("Read already in flight, sharing its result");
            return;
        }

        self.read_in_flight = true;
        self.reads_issued += 1;

        let epoch = self.write_epoch;
        let backend = Arc::clone(&self.backend);
        let call_timeout = self.call_timeout;
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(call_timeout, backend.read()).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(call_timeout)),
            };
            let _ = events_tx.send(GateEvent::ReadDone { epoch, result });
        });
    }

    /// Hand a finished read to every waiter and judge whether it is usable
    pub fn on_read_done(&mut self, epoch: u64, result: Result<u8, BackendError>) -> ReadOutcome {
        self.read_in_flight = false;

        if let Err(e) = &result {
            warn!(error = %e, "Backend read failed");
        }

        for waiter in self.read_waiters.drain(..) {
            let _ = waiter.send(result.clone());
        }

        let stale = epoch != self.write_epoch || self.is_write_pending();
        ReadOutcome { result, stale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;

    const TIMEOUT: Duration = Duration::from_secs(3);

    fn make_gate(backend: &SimulatedBackend) -> (BackendGate, mpsc::UnboundedReceiver<GateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = BackendGate::new(Arc::new(backend.clone()), TIMEOUT, tx);
        (gate, rx)
    }

    /// Pump gate events until nothing is pending
    async fn settle(gate: &mut BackendGate, rx: &mut mpsc::UnboundedReceiver<GateEvent>) {
        while gate.is_write_pending() || gate.is_read_in_flight() {
            match rx.recv().await.expect("gate channel closed") {
                GateEvent::WriteDone { target, result } => gate.on_write_done(target, &result),
                GateEvent::ReadDone { epoch, result } => {
                    gate.on_read_done(epoch, result);
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_targets_are_dropped() {
        let backend = SimulatedBackend::new(0).with_latency(Duration::from_millis(200));
        let (mut gate, mut rx) = make_gate(&backend);

        gate.request_write(5);
        gate.request_write(10);
        gate.request_write(20);
        gate.request_write(30);
        assert!(gate.is_write_pending());

        settle(&mut gate, &mut rx).await;

        assert_eq!(backend.writes(), vec![5, 30]);
        assert_eq!(backend.max_concurrent_writes(), 1);
        assert_eq!(gate.writes_issued(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_still_drains_queue() {
        let backend = SimulatedBackend::new(0).with_latency(Duration::from_millis(50));
        backend.fail_next_writes(1);
        let (mut gate, mut rx) = make_gate(&backend);

        gate.request_write(15);
        gate.request_write(25);
        settle(&mut gate, &mut rx).await;

        // 15 failed and is not retried; 25 still lands
        assert_eq!(backend.writes(), vec![25]);
        assert_eq!(backend.volume(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_timeout_frees_the_gate() {
        let backend = SimulatedBackend::new(0).with_latency(Duration::from_secs(10));
        let (mut gate, mut rx) = make_gate(&backend);

        gate.request_write(40);
        match rx.recv().await.unwrap() {
            GateEvent::WriteDone { target, result } => {
                assert_eq!(target, 40);
                assert_eq!(result, Err(BackendError::Timeout(TIMEOUT)));
                gate.on_write_done(target, &result);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!gate.is_write_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_are_single_flight() {
        let backend = SimulatedBackend::new(64).with_latency(Duration::from_millis(100));
        let (mut gate, mut rx) = make_gate(&backend);

        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        gate.request_read(Some(tx_a));
        gate.request_read(None);
        gate.request_read(Some(tx_b));

        settle(&mut gate, &mut rx).await;

        assert_eq!(rx_a.await.unwrap(), Ok(64));
        assert_eq!(rx_b.await.unwrap(), Ok(64));
        assert_eq!(backend.read_count(), 1);
        assert_eq!(gate.reads_issued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_racing_a_write_is_stale() {
        let backend = SimulatedBackend::new(50);
        backend.set_read_latency(Duration::from_millis(100));
        backend.set_write_latency(Duration::from_millis(10));
        let (mut gate, mut rx) = make_gate(&backend);

        gate.request_read(None);
        gate.request_write(40);

        let mut outcomes = Vec::new();
        while gate.is_write_pending() || gate.is_read_in_flight() {
            match rx.recv().await.unwrap() {
                GateEvent::WriteDone { target, result } => gate.on_write_done(target, &result),
                GateEvent::ReadDone { epoch, result } => {
                    outcomes.push(gate.on_read_done(epoch, result));
                }
            }
        }

        // The write finished first, but the read was issued before it started
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_read_is_fresh() {
        let backend = SimulatedBackend::new(12);
        let (mut gate, mut rx) = make_gate(&backend);

        gate.request_read(None);
        match rx.recv().await.unwrap() {
            GateEvent::ReadDone { epoch, result } => {
                let outcome = gate.on_read_done(epoch, result);
                assert_eq!(outcome.result, Ok(12));
                assert!(!outcome.stale);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
