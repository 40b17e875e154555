use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Process-wide "crawling disabled until" timestamp
///
/// Stored as milliseconds since the breaker was created, with 0 meaning
/// closed, so checking it never takes a lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    epoch: Instant,
    disabled_until_ms: AtomicU64,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            disabled_until_ms: AtomicU64::new(0),
        }
    }

    /// Disables crawling for `duration` from now
    ///
    /// An already later deadline is kept.
    pub fn trip(&self, duration: Duration) {
        let until = self.now_ms().saturating_add(duration.as_millis() as u64).max(1);
        self.disabled_until_ms.fetch_max(until, Ordering::SeqCst);
        tracing::warn!("Crawling disabled for {}s", duration.as_secs());
    }

    /// Crawling is currently disabled
    pub fn is_open(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left until crawling is enabled again
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.disabled_until_ms.load(Ordering::SeqCst);
        let now = self.now_ms();
        (until > now).then(|| Duration::from_millis(until - now))
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}
