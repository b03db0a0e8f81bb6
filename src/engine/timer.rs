//! Arm/disarm deadline timer
//!
//! The actor owns one `Timer` per scheduled concern (rotation flush, poll).
//! A disarmed timer never fires; `expired()` returns a future that does not
//! borrow the timer, so it can sit in a `select!` next to `&mut self` work.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Schedule the timer `after` from now, replacing any previous deadline
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Schedule the timer only if it is not already pending
    ///
    /// Returns true if this call armed it.
    pub fn arm_if_idle(&mut self, after: Duration) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.arm(after);
        true
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Future resolving at the current deadline, or never when disarmed
    pub fn expired(&self) -> impl Future<Output = ()> + Send + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_armed_timer_fires() {
        let mut timer = Timer::new();
        timer.arm(Duration::from_millis(50));
        assert!(timer.is_armed());

        let start = Instant::now();
        timer.expired().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut timer = Timer::new();
        timer.arm(Duration::from_millis(10));
        timer.disarm();

        let result = tokio::time::timeout(Duration::from_secs(60), timer.expired()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_arm_if_idle_keeps_first_deadline() {
        let mut timer = Timer::new();
        assert!(timer.arm_if_idle(Duration::from_millis(50)));
        let first = timer.deadline;
        assert!(!timer.arm_if_idle(Duration::from_millis(500)));
        assert_eq!(timer.deadline, first);
    }
}
