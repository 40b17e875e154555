use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Keys blocked until a deadline
#[derive(Debug, Default, Clone)]
pub struct TtlDenylist {
    blocked_until: HashMap<String, Instant>,
}

impl TtlDenylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left on the block for `key`, if it is blocked
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        let until = self.blocked_until.get(key)?;
        let now = Instant::now();
        (*until > now).then(|| *until - now)
    }

    /// Blocks `key` for `window` from now
    pub fn arm(&mut self, key: &str, window: Duration) {
        self.blocked_until
            .insert(key.to_string(), Instant::now() + window);
    }

    /// Drops entries whose block has run out
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        self.blocked_until.retain(|_, until| *until > now);
    }

    pub fn len(&self) -> usize {
        self.blocked_until.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked_until.is_empty()
    }
}
