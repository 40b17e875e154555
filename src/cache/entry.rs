use crate::crawler::CrawlResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A cached crawl result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<CrawlResult>,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: Arc<CrawlResult>, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    /// Checks if the entry is older than its TTL
    pub fn is_stale(&self) -> bool {
        self.age() >= self.ttl
    }
}
