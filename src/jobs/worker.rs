use crate::jobs::{CompletedJobRegistry, CrawlJob, JobId, JobQueue};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Processes one job to completion
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Returns the job with its completion fields set
    async fn handle(&self, job: CrawlJob) -> CrawlJob;
}

/// Single consumer of the job queue
///
/// Jobs run strictly one after another. After each job the worker idles
/// until at least the cooldown has passed since the job started.
pub struct Worker {
    queue: Arc<JobQueue>,
    registry: Arc<CompletedJobRegistry>,
    handler: Arc<dyn JobHandler>,
    cooldown: Duration,
    last_job_ms: AtomicU64,
    running: Mutex<Option<JobId>>,
}

impl Worker {
    pub fn new(
        queue: Arc<JobQueue>,
        registry: Arc<CompletedJobRegistry>,
        handler: Arc<dyn JobHandler>,
        cooldown: Duration,
    ) -> Self {
        Self {
            queue,
            registry,
            handler,
            cooldown,
            // No job has run yet, the cooldown is the best estimate
            last_job_ms: AtomicU64::new(cooldown.as_millis() as u64),
            running: Mutex::new(None),
        }
    }

    /// Wall-clock time of the last job, never less than the cooldown
    pub fn last_job_duration(&self) -> Duration {
        Duration::from_millis(self.last_job_ms.load(Ordering::SeqCst))
    }

    /// The job currently being processed
    pub fn running(&self) -> Option<JobId> {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consumes the queue until `shutdown` is cancelled
    ///
    /// A job that panics is logged and dropped; the loop carries on.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!("Job worker started");

        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.queue.next() => job,
            };

            let started = Instant::now();
            let id = job.id;
            let url = job.product_url.clone();
            self.set_running(Some(id));
            tracing::info!("Starting job {} for {}", id, url);

            let handler = Arc::clone(&self.handler);
            match tokio::spawn(async move { handler.handle(job).await }).await {
                Ok(completed) if completed.is_completed() => {
                    tracing::info!(
                        "Job {} for {} completed (success: {})",
                        id,
                        url,
                        completed.success
                    );
                    self.registry.record(completed);
                }
                Ok(_) => tracing::error!("Job {} for {} was returned unfinished", id, url),
                Err(e) => tracing::error!("Error executing job {} for {}: {}", id, url, e),
            }
            self.set_running(None);

            let elapsed = started.elapsed();
            self.last_job_ms
                .store(elapsed.max(self.cooldown).as_millis() as u64, Ordering::SeqCst);

            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                tracing::debug!("Cooling down for {:?}", remaining);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(remaining) => {}
                }
            }
        }

        tracing::info!("Job worker stopped");
    }

    fn set_running(&self, id: Option<JobId>) {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = id;
    }
}
