use crate::jobs::{CrawlJob, JobId};
use crate::url::ProductUrl;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Unbounded FIFO of pending jobs with a single consumer
///
/// The pending jobs stay inspectable so submissions can be merged into an
/// already queued job and positions can be reported.
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: Mutex<VecDeque<CrawlJob>>,
    available: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job and wakes the consumer
    pub fn submit(&self, job: CrawlJob) -> JobId {
        let id = job.id;
        tracing::info!("Job {} queued for {}", id, job.product_url);
        self.lock().push_back(job);
        self.available.notify_one();
        id
    }

    /// Adds `contact` to a pending job for `url`, if there is one
    ///
    /// Returns the id of the pending job.
    pub fn merge_pending(&self, url: &ProductUrl, contact: Option<&str>) -> Option<JobId> {
        let mut pending = self.lock();
        let job = pending.iter_mut().find(|job| &job.product_url == url)?;
        if let Some(contact) = contact {
            if job.add_contact(contact) {
                tracing::info!("Added contact to pending job {} for {}", job.id, url);
            }
        }
        Some(job.id)
    }

    /// Zero-based position of a pending job
    pub fn position(&self, id: JobId) -> Option<usize> {
        self.lock().iter().position(|job| job.id == id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes the oldest job without waiting
    pub fn try_next(&self) -> Option<CrawlJob> {
        self.lock().pop_front()
    }

    /// Waits for and removes the oldest job
    ///
    /// Cancel safe: a job is only removed when this future completes.
    pub async fn next(&self) -> CrawlJob {
        loop {
            if let Some(job) = self.try_next() {
                return job;
            }
            self.available.notified().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CrawlJob>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
