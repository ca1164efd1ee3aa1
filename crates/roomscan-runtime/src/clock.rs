//! Injectable time source for the scan loop.
//!
//! The calibration loop suspends in exactly two places: the tracking warm-up
//! wait and the per-iteration polling interval.  Both go through [`Clock`] so
//! tests can swap in [`ManualClock`] and run a full session without real
//! delays.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Suspension points used by the calibration loop.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created.
    fn elapsed(&self) -> Duration;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

// ─────────────────────────────────────────────────────────────────────────────
// TokioClock
// ─────────────────────────────────────────────────────────────────────────────

/// Wall-clock implementation backed by `tokio::time`.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ManualClock
// ─────────────────────────────────────────────────────────────────────────────

/// Virtual clock: `sleep` advances time instantly and only yields once.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: AtomicUsize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward without sleeping.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += duration;
        }
    }

    /// Number of `sleep` calls served so far.
    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.fetch_add(1, Ordering::AcqRel);
        tokio::task::yield_now().await;
    }
}
