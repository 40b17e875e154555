use crate::cache::CacheEntry;
use crate::crawler::CrawlResult;
use crate::SweepError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Outcome published to callers waiting on an in-flight computation
type Shared = Option<Result<Arc<CrawlResult>, String>>;

enum Slot {
    Ready(CacheEntry),
    Pending(watch::Receiver<Shared>),
}

enum Role {
    Leader(watch::Sender<Shared>),
    Follower(watch::Receiver<Shared>),
}

/// TTL cache of crawl results with single-flight computation
///
/// At most one computation runs per key. Callers arriving while it runs
/// wait for its outcome instead of starting their own. Failed computations
/// are not cached.
pub struct ResultCache {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the fresh result for `key`, computing it if needed
    ///
    /// # Arguments
    ///
    /// * `key` - Normalized product URL
    /// * `compute` - Produces the result on a miss; only called by the
    ///   caller that wins the computation for this key
    ///
    /// # Errors
    ///
    /// The computing caller gets the original error. Callers that waited on
    /// it get `SweepError::Crawl` carrying the error message.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<Arc<CrawlResult>, SweepError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CrawlResult, SweepError>>,
    {
        loop {
            let role = {
                let mut slots = self.lock_slots();
                match slots.get(key) {
                    Some(Slot::Ready(entry)) if !entry.is_stale() => {
                        tracing::debug!("Cache hit for {}", key);
                        return Ok(Arc::clone(&entry.value));
                    }
                    Some(Slot::Pending(receiver)) => Role::Follower(receiver.clone()),
                    _ => {
                        let (sender, receiver) = watch::channel(None);
                        slots.insert(key.to_string(), Slot::Pending(receiver));
                        Role::Leader(sender)
                    }
                }
            };

            match role {
                Role::Follower(mut receiver) => {
                    tracing::debug!("Waiting for in-flight crawl of {}", key);
                    let outcome = receiver
                        .wait_for(Option::is_some)
                        .await
                        .map(|shared| (*shared).clone());

                    match outcome {
                        Ok(Some(Ok(value))) => return Ok(value),
                        Ok(Some(Err(message))) => {
                            return Err(SweepError::Crawl {
                                url: key.to_string(),
                                message,
                            })
                        }
                        // The computing caller went away; compete again
                        _ => continue,
                    }
                }
                Role::Leader(sender) => {
                    let mut pending = PendingSlot {
                        cache: self,
                        key,
                        armed: true,
                    };

                    let result = compute().await.map(Arc::new);

                    {
                        let mut slots = self.lock_slots();
                        match &result {
                            Ok(value) => {
                                drop_stale(&mut slots);
                                slots.insert(
                                    key.to_string(),
                                    Slot::Ready(CacheEntry::new(Arc::clone(value), self.ttl)),
                                );
                            }
                            Err(_) => {
                                slots.remove(key);
                            }
                        }
                        pending.armed = false;
                    }

                    let shared = match &result {
                        Ok(value) => Ok(Arc::clone(value)),
                        Err(e) => Err(e.to_string()),
                    };
                    // No receivers left is fine
                    let _ = sender.send(Some(shared));

                    return result;
                }
            }
        }
    }

    /// Returns the cached result for `key` if it is still fresh
    ///
    /// A stale entry for `key` is dropped on the way.
    pub fn get_fresh(&self, key: &str) -> Option<Arc<CrawlResult>> {
        let mut slots = self.lock_slots();
        match slots.get(key) {
            Some(Slot::Ready(entry)) if !entry.is_stale() => Some(Arc::clone(&entry.value)),
            Some(Slot::Ready(_)) => {
                slots.remove(key);
                None
            }
            _ => None,
        }
    }

    pub fn contains_fresh(&self, key: &str) -> bool {
        self.get_fresh(key).is_some()
    }

    /// Number of cached or in-flight keys
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops stale ready entries
fn drop_stale(slots: &mut HashMap<String, Slot>) {
    slots.retain(|_, slot| match slot {
        Slot::Ready(entry) => !entry.is_stale(),
        Slot::Pending(_) => true,
    });
}

/// Removes a pending slot whose computing caller was dropped mid-flight
struct PendingSlot<'a> {
    cache: &'a ResultCache,
    key: &'a str,
    armed: bool,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slots = self.cache.lock_slots();
            if matches!(slots.get(self.key), Some(Slot::Pending(_))) {
                slots.remove(self.key);
            }
        }
    }
}
