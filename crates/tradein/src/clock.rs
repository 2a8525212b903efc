//! Injected clock.
//!
//! Every wait, deadline and backoff in the engine goes through [`Clock`], so
//! tests can swap in [`FakeClock`] and run a 30 second deadline without any
//! real waiting.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Source of time for the engine
#[async_trait]
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real time backed by tokio timers
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock starting at zero now
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
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
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: `sleep` advances time instantly.
///
/// Concurrent sleepers share one timeline. Each sleeper registers its wake-up
/// time and virtual time only moves to the earliest pending wake-up, so two
/// 100ms sleeps running side by side end at 100ms, not 200ms.
#[derive(Debug, Default)]
pub struct FakeClock {
    current_ms: AtomicU64,
    sleeps: Mutex<Vec<u64>>,
    next_sleeper: AtomicU64,
    // sleeper id -> wake-up time in ms
    pending: Mutex<BTreeMap<u64, u64>>,
}

impl FakeClock {
    /// Create a fake clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Advance virtual time without recording a sleep
    pub fn fast_forward(&self, duration: Duration) {
        self.current_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Every sleep requested so far, in milliseconds
    #[must_use]
    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn earliest_wake(&self) -> Option<u64> {
        self.pending
            .lock()
            .ok()
            .and_then(|pending| pending.values().min().copied())
    }
}

/// Deregisters a sleeper when its future completes or is dropped mid-sleep
struct PendingWake<'a> {
    clock: &'a FakeClock,
    id: u64,
}

impl<'a> PendingWake<'a> {
    fn register(clock: &'a FakeClock, wake_ms: u64) -> Self {
        let id = clock.next_sleeper.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pending) = clock.pending.lock() {
            pending.insert(id, wake_ms);
        }
        Self { clock, id }
    }
}

impl Drop for PendingWake<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.clock.pending.lock() {
            pending.remove(&self.id);
        }
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms())
    }

    async fn sleep(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(ms);
        }
        let wake = self.now_ms().saturating_add(ms);
        let _registered = PendingWake::register(self, wake);
        loop {
            // Let sibling futures in a join/select run and register first.
            tokio::task::yield_now().await;
            if self.now_ms() >= wake {
                return;
            }
            if self.earliest_wake().map_or(true, |earliest| earliest >= wake) {
                self.current_ms.fetch_max(wake, Ordering::SeqCst);
                return;
            }
        }
    }
}
