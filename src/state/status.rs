use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug)]
struct Entry {
    generation: u64,
    progress: String,
}

/// Progress of in-flight crawls, keyed by normalized product URI
///
/// An entry only exists while its crawl runs. Pollers read it without
/// blocking the crawl for longer than a map lookup.
///
/// Every tracked crawl gets a generation number. Updates carry it and are
/// ignored once that crawl's entry is gone, so a branch task finishing after
/// its crawl was abandoned cannot leave a stale entry behind.
#[derive(Debug, Default)]
pub struct StatusTracker {
    entries: RwLock<HashMap<String, Entry>>,
    next_generation: AtomicU64,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records "done/total branches done" for the crawl `generation` of `uri`
    ///
    /// Returns `false` without changing anything if that crawl is no longer
    /// tracked.
    pub fn set_progress(&self, uri: &str, generation: u64, done: usize, total: usize) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(uri) {
            Some(entry) if entry.generation == generation => {
                entry.progress = progress(done, total);
                true
            }
            _ => false,
        }
    }

    /// Removes the entry for `uri`
    pub fn clear(&self, uri: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri);
    }

    /// Current progress for `uri`, if a crawl is running for it
    pub fn get(&self, uri: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .map(|entry| entry.progress.clone())
    }

    /// Number of crawls currently reporting progress
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts tracking `uri` at 0/`total`
    ///
    /// The entry is cleared when the returned guard drops, which also covers
    /// early returns, cancellation of the enclosing future and panics.
    pub fn track(&self, uri: &str, total: usize) -> StatusGuard<'_> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                uri.to_string(),
                Entry {
                    generation,
                    progress: progress(0, total),
                },
            );
        StatusGuard {
            tracker: self,
            uri: uri.to_string(),
            generation,
        }
    }

    fn clear_generation(&self, uri: &str, generation: u64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(uri).map(|entry| entry.generation) == Some(generation) {
            entries.remove(uri);
        }
    }
}

fn progress(done: usize, total: usize) -> String {
    format!("{}/{} branches done", done, total)
}

/// Clears a status entry on drop
#[must_use = "the status entry is cleared as soon as the guard is dropped"]
pub struct StatusGuard<'a> {
    tracker: &'a StatusTracker,
    uri: String,
    generation: u64,
}

impl StatusGuard<'_> {
    /// Generation to pass to [`StatusTracker::set_progress`]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        self.tracker.clear_generation(&self.uri, self.generation);
    }
}
