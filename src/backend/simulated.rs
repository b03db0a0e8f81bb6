//! Simulated backend - in-memory mixer for development and tests
//!
//! Behaves like a slow mixer: every call sleeps for the configured latency.
//! It also keeps an audit of the calls it saw, so overlapping writes and
//! duplicate reads are observable.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{BackendError, VolumeBackend};

#[derive(Debug, Default)]
struct SimState {
    volume: u8,
    read_latency: Duration,
    write_latency: Duration,
    reads: usize,
    writes: Vec<u8>,
    writes_in_flight: usize,
    max_concurrent_writes: usize,
    fail_reads: bool,
    fail_writes: usize,
}

struct InFlightWrite<'a>(&'a Mutex<SimState>);

impl Drop for InFlightWrite<'_> {
    fn drop(&mut self) {
        self.0.lock().writes_in_flight -= 1;
    }
}

/// In-memory volume backend with latency and failure injection
///
/// Cheap to clone; clones share the same simulated mixer.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    /// Create a simulated mixer at the given volume with no latency
    pub fn new(volume: u8) -> Self {
        let backend = Self::default();
        backend.state.lock().volume = volume.min(100);
        backend
    }

    /// Set the same latency for reads and writes
    pub fn with_latency(self, latency: Duration) -> Self {
        {
            let mut state = self.state.lock();
            state.read_latency = latency;
            state.write_latency = latency;
        }
        self
    }

    pub fn set_read_latency(&self, latency: Duration) {
        self.state.lock().read_latency = latency;
    }

    pub fn set_write_latency(&self, latency: Duration) {
        self.state.lock().write_latency = latency;
    }

    /// Change the volume behind the engine's back (another controller)
    pub fn set_external(&self, volume: u8) {
        self.state.lock().volume = volume.min(100);
    }

    /// Current mixer volume
    pub fn volume(&self) -> u8 {
        self.state.lock().volume
    }

    /// Every write that reached the mixer, in completion order
    pub fn writes(&self) -> Vec<u8> {
        self.state.lock().writes.clone()
    }

    /// Number of read calls issued against the mixer
    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }

    /// Highest number of writes ever observed running at once
    pub fn max_concurrent_writes(&self) -> usize {
        self.state.lock().max_concurrent_writes
    }

    /// Make every read fail until cleared
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Make the next `count` writes fail
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }
}

#[async_trait]
impl VolumeBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn read(&self) -> Result<u8, BackendError> {
        let latency = {
            let mut state = self.state.lock();
            state.reads += 1;
            state.read_latency
        };

        tokio::time::sleep(latency).await;

        let state = self.state.lock();
        if state.fail_reads {
            return Err(BackendError::Command("simulated read failure".to_string()));
        }
        Ok(state.volume)
    }

    async fn write(&self, volume: u8) -> Result<(), BackendError> {
        let latency = {
            let mut state = self.state.lock();
            state.writes_in_flight += 1;
            state.max_concurrent_writes = state.max_concurrent_writes.max(state.writes_in_flight);
            state.write_latency
        };
        // Also released when a timeout drops this call mid-sleep
        let _in_flight = InFlightWrite(&self.state);

        tokio::time::sleep(latency).await;

        let mut state = self.state.lock();
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(BackendError::Command("simulated write failure".to_string()));
        }

        state.volume = volume.min(100);
        state.writes.push(volume);
        info!(
            "🔊 [{}] Simulated mixer → {}%",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            volume
        );
        Ok(())
    }
}
