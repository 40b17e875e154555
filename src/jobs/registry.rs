use crate::jobs::{CrawlJob, JobId};
use crate::storage::{SqliteStorage, Storage};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

type RegistryKey = Reverse<(DateTime<Utc>, JobId)>;

struct Inner {
    entries: BTreeMap<RegistryKey, CrawlJob>,
    store: Option<Box<dyn Storage>>,
}

/// Bounded record of recently completed jobs, most recent first
///
/// Holds at most one job per product URL and at most `capacity` jobs.
pub struct CompletedJobRegistry {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl CompletedJobRegistry {
    /// Creates an empty in-memory registry
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: BTreeMap::new(),
                store: None,
            }),
        }
    }

    /// Creates a registry backed by a snapshot store, loading its contents
    ///
    /// A store that fails to load is cleared and the registry starts empty.
    pub fn with_store(capacity: usize, mut store: Box<dyn Storage>) -> Self {
        let registry = Self::new(capacity);

        match store.load_completed() {
            Ok(jobs) => {
                tracing::info!("Restored {} completed jobs from snapshot", jobs.len());
                for job in jobs {
                    registry.insert(job);
                }
            }
            Err(e) => {
                tracing::warn!("Could not restore completed jobs, discarding snapshot: {}", e);
                if let Err(e) = store.clear_completed() {
                    tracing::warn!("Could not clear completed jobs snapshot: {}", e);
                }
            }
        }

        registry.lock().store = Some(store);
        registry
    }

    /// Opens the SQLite snapshot at `path`
    ///
    /// An unreadable or corrupt file is deleted and replaced. If no snapshot
    /// can be opened at all the registry runs in memory only.
    pub fn open(capacity: usize, path: &Path) -> Self {
        let storage = SqliteStorage::new(path)
            .and_then(|storage| storage.load_completed().map(|_| storage))
            .or_else(|e| {
                tracing::warn!(
                    "Discarding completed jobs snapshot {}: {}",
                    path.display(),
                    e
                );
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("Could not delete {}: {}", path.display(), e);
                }
                SqliteStorage::new(path)
            });

        match storage {
            Ok(storage) => Self::with_store(capacity, Box::new(storage)),
            Err(e) => {
                tracing::warn!("Completed jobs will not be persisted: {}", e);
                Self::new(capacity)
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records a completed job
    ///
    /// Any earlier job for the same product URL is replaced, and the oldest
    /// job is evicted when the registry is over capacity. The snapshot, if
    /// any, is rewritten afterwards.
    pub fn record(&self, job: CrawlJob) {
        tracing::debug!("Recording completed job {} for {}", job.id, job.product_url);
        self.insert(job);

        let mut inner = self.lock();
        let Inner { entries, store } = &mut *inner;
        if let Some(store) = store {
            let jobs: Vec<CrawlJob> = entries.values().cloned().collect();
            if let Err(e) = store.save_completed(&jobs) {
                tracing::warn!("Could not write completed jobs snapshot: {}", e);
            }
        }
    }

    /// Completed jobs, most recent first
    pub fn snapshot(&self) -> Vec<CrawlJob> {
        self.lock().entries.values().cloned().collect()
    }

    pub fn find(&self, id: JobId) -> Option<CrawlJob> {
        self.lock()
            .entries
            .values()
            .find(|job| job.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, job: CrawlJob) {
        let completed_at = job.completed_at.unwrap_or_else(Utc::now);
        let mut inner = self.lock();

        inner
            .entries
            .retain(|_, existing| existing.product_url != job.product_url);
        inner.entries.insert(Reverse((completed_at, job.id)), job);

        while inner.entries.len() > self.capacity {
            // Largest key under Reverse is the oldest completion
            inner.entries.pop_last();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
