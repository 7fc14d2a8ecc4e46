//! Clock and delay source for the staged pipeline
//!
//! `TokioScheduler` sleeps for real. `VirtualScheduler` advances a virtual
//! clock instantly so a full run completes without wall-clock waits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Scheduler: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct VirtualClock {
    now: DateTime<Utc>,
    slept: Duration,
}

/// Zero-wait scheduler with a virtual clock
#[derive(Debug)]
pub struct VirtualScheduler {
    clock: Mutex<VirtualClock>,
}

impl VirtualScheduler {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            clock: Mutex::new(VirtualClock {
                now: start,
                slept: Duration::ZERO,
            }),
        }
    }

    /// Total virtual time spent sleeping
    pub fn total_slept(&self) -> Duration {
        match self.clock.lock() {
            Ok(clock) => clock.slept,
            Err(poisoned) => poisoned.into_inner().slept,
        }
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[async_trait]
impl Scheduler for VirtualScheduler {
    fn now(&self) -> DateTime<Utc> {
        match self.clock.lock() {
            Ok(clock) => clock.now,
            Err(poisoned) => poisoned.into_inner().now,
        }
    }

    async fn sleep(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        {
            let mut clock = match self.clock.lock() {
                Ok(clock) => clock,
                Err(poisoned) => poisoned.into_inner(),
            };
            clock.now += step;
            clock.slept += duration;
        }
        // Let other tasks (e.g. a canceller) observe the suspension point
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_virtual_sleep_advances_clock() {
        let scheduler = VirtualScheduler::default();
        let start = scheduler.now();

        scheduler.sleep(Duration::from_millis(1500)).await;

        assert_eq!(scheduler.now() - start, chrono::Duration::milliseconds(1500));
        assert_eq!(scheduler.total_slept(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_sleeps() {
        let scheduler = TokioScheduler;
        let before = std::time::Instant::now();
        scheduler.sleep(Duration::from_millis(5)).await;
        assert!(before.elapsed() >= Duration::from_millis(5));
    }
}
