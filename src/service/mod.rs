//! Service context for Price-Sweep
//!
//! `PriceService` is built once at startup and shared by `Arc`. It wires the
//! crawl core together and exposes the inbound surface: submitting jobs,
//! polling progress and jobs, and interactive price lookups.

mod collector;
mod handler;

pub use collector::PriceCollector;
pub use handler::CrawlJobHandler;

use crate::admission::{AdmissionController, AdmissionRejected};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::crawler::{
    CrawlOrchestrator, CrawlResult, HttpSessionFactory, PageExtractor, SelectorExtractor,
    SessionFactory,
};
use crate::jobs::{CompletedJobRegistry, CrawlJob, JobId, JobQueue, JobStatus, Worker};
use crate::output::{LogNotifier, Notifier};
use crate::state::{CircuitBreaker, StatusTracker};
use crate::url::{normalize_product_url, ProductUrl};
use crate::{SweepError, UrlError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome of an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub job_id: JobId,
    /// The request joined a job that was already queued for the product
    pub merged: bool,
}

/// Shared service context
pub struct PriceService {
    base_url: String,
    collector: Arc<PriceCollector>,
    admission: AdmissionController,
    queue: Arc<JobQueue>,
    registry: Arc<CompletedJobRegistry>,
    worker: Arc<Worker>,
    shutdown: CancellationToken,
}

impl PriceService {
    /// Wires the service together
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `factory` - Creates browser sessions
    /// * `extractor` - Reads prices from branch pages
    /// * `notifier` - Delivers results of completed jobs
    pub fn new(
        config: &Config,
        factory: Arc<dyn SessionFactory>,
        extractor: Arc<dyn PageExtractor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let orchestrator = Arc::new(CrawlOrchestrator::new(
            config,
            factory,
            extractor,
            Arc::new(CircuitBreaker::new()),
            Arc::new(StatusTracker::new()),
        ));
        let cache = Arc::new(ResultCache::new(config.cache.ttl()));
        let collector = Arc::new(PriceCollector::new(orchestrator, cache));

        let registry = Arc::new(match &config.queue.snapshot_path {
            Some(path) => CompletedJobRegistry::open(config.queue.completed_capacity, path),
            None => CompletedJobRegistry::new(config.queue.completed_capacity),
        });

        let shutdown = CancellationToken::new();
        let queue = Arc::new(JobQueue::new());
        let handler = CrawlJobHandler::new(Arc::clone(&collector), notifier, shutdown.child_token());
        let worker = Arc::new(Worker::new(
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::new(handler),
            config.queue.cooldown(),
        ));

        Self {
            base_url: config.site.base_url.clone(),
            collector,
            admission: AdmissionController::new(config.admission.window()),
            queue,
            registry,
            worker,
            shutdown,
        }
    }

    /// Builds the service with the HTTP session, selector extractor and log notifier
    ///
    /// # Errors
    ///
    /// Returns an error if a configured selector does not parse.
    pub fn with_defaults(config: &Config) -> Result<Self, SweepError> {
        let extractor = SelectorExtractor::from_config(&config.site.selectors)?;
        Ok(Self::new(
            config,
            Arc::new(HttpSessionFactory),
            Arc::new(extractor),
            Arc::new(LogNotifier),
        ))
    }

    /// Normalizes a submitted product URL against the configured shop
    pub fn normalize(&self, url: &str) -> Result<ProductUrl, UrlError> {
        normalize_product_url(url, &self.base_url)
    }

    /// Queues a crawl job for `url`
    ///
    /// A request for a product that is already queued joins that job
    /// instead, bypassing the rate limits.
    ///
    /// # Arguments
    ///
    /// * `url` - Product page URL as submitted
    /// * `contact` - Optional address notified on completion
    /// * `identity` - Requester identity used for rate limiting
    ///
    /// # Errors
    ///
    /// * `SweepError::UrlError` - The URL is not a product page of the shop
    /// * `SweepError::Rejected` - Rate limited, or crawling is disabled
    pub fn submit(
        &self,
        url: &str,
        contact: Option<&str>,
        identity: &str,
    ) -> Result<Submission, SweepError> {
        let product = self.normalize(url)?;

        if let Some(job_id) = self.queue.merge_pending(&product, contact) {
            return Ok(Submission {
                job_id,
                merged: true,
            });
        }

        if let Some(retry_after) = self.disabled_for() {
            if !self.collector.cache().contains_fresh(product.as_str()) {
                return Err(AdmissionRejected::Disabled { retry_after }.into());
            }
        }

        self.admission.try_admit(identity, product.as_str())?;

        let job_id = self.queue.submit(CrawlJob::new(product, contact));
        Ok(Submission {
            job_id,
            merged: false,
        })
    }

    /// Progress of the crawl running for `url`, if any
    pub fn status(&self, url: &str) -> Option<String> {
        let product = self.normalize(url).ok()?;
        self.collector
            .orchestrator()
            .status()
            .get(product.as_str())
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Estimated time until a job completes
    ///
    /// Without a job (or for a job no longer queued) the estimate is for a
    /// job submitted now.
    pub fn estimated_wait(&self, job_id: Option<JobId>) -> Duration {
        let position = job_id
            .and_then(|id| self.queue.position(id))
            .unwrap_or_else(|| self.queue.len());
        self.worker.last_job_duration() * (position as u32 + 1)
    }

    /// Recently completed jobs, most recent first
    pub fn recently_completed(&self) -> Vec<CrawlJob> {
        self.registry.snapshot()
    }

    /// Where job `id` currently is
    pub fn job(&self, id: JobId) -> Option<JobStatus> {
        if let Some(position) = self.queue.position(id) {
            return Some(JobStatus::Pending { position });
        }
        if self.worker.running() == Some(id) {
            return Some(JobStatus::Running);
        }
        self.registry.find(id).map(JobStatus::Completed)
    }

    /// Time left until crawling is enabled again, if disabled
    pub fn disabled_for(&self) -> Option<Duration> {
        self.collector.orchestrator().breaker().remaining()
    }

    /// Looks up the prices for `url` interactively
    pub async fn collect_prices(&self, url: &str) -> Result<Arc<CrawlResult>, SweepError> {
        let product = self.normalize(url)?;
        self.collector
            .collect(&product, &self.shutdown.child_token())
            .await
    }

    /// Spawns the job worker
    pub fn start_worker(&self) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(&self.worker).run(self.shutdown.child_token()))
    }

    /// Stops the worker and keeps new branch fetches from starting
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SendError;
    use crate::testing::{config, FakeFactory, PriceTable};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(Vec<String>, String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            addresses: &[String],
            subject: &str,
            body: &str,
        ) -> Result<(), SendError> {
            self.sent
                .lock()
                .unwrap()
                .push((addresses.to_vec(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn service(branches: usize, prices: PriceTable, notifier: Arc<RecordingNotifier>) -> PriceService {
        PriceService::new(
            &config(branches, 3, 5),
            Arc::new(FakeFactory::default()),
            Arc::new(prices),
            notifier,
        )
    }

    async fn wait_for_completion(service: &PriceService, id: JobId) -> CrawlJob {
        for _ in 0..1000 {
            if let Some(JobStatus::Completed(job)) = service.job(id) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {} did not complete", id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_lifecycle() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(3, PriceTable::uniform(3), Arc::clone(&notifier));

        let submission = service
            .submit("http://shop.example/p/tv?branch_id=b02", Some("a@example.com"), "ip1")
            .unwrap();
        assert!(!submission.merged);
        assert_eq!(
            service.job(submission.job_id),
            Some(JobStatus::Pending { position: 0 })
        );
        assert_eq!(service.queue_depth(), 1);

        let worker = service.start_worker();
        let job = wait_for_completion(&service, submission.job_id).await;

        assert!(job.success);
        assert_eq!(job.product_name.as_deref(), Some("Television"));
        assert_eq!(job.product_url.as_str(), "https://www.shop.example/p/tv");
        assert!(job.result_body.unwrap().contains("<table"));
        assert_eq!(service.recently_completed().len(), 1);
        assert!(service.status("https://www.shop.example/p/tv").is_none());

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["a@example.com".to_string()]);
        assert!(sent[0].1.contains("Television"));

        service.shutdown();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_merges_contacts() {
        let service = service(3, PriceTable::uniform(3), Arc::default());

        let first = service
            .submit("https://www.shop.example/p/tv", Some("a@example.com"), "ip1")
            .unwrap();
        let second = service
            .submit("https://shop.example/p/tv/", Some("b@example.com"), "ip2")
            .unwrap();

        assert!(second.merged);
        assert_eq!(second.job_id, first.job_id);
        assert_eq!(service.queue_depth(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limits() {
        let service = service(3, PriceTable::uniform(3), Arc::default());

        service
            .submit("https://www.shop.example/p/a", None, "ip1")
            .unwrap();
        let rejected = service.submit("https://www.shop.example/p/b", None, "ip1");
        assert!(matches!(
            rejected,
            Err(SweepError::Rejected(AdmissionRejected::ClientThrottled { .. }))
        ));

        // Once the job for /p/a left the queue, its product key still blocks it
        let _ = service.queue.try_next();
        let rejected = service.submit("https://www.shop.example/p/a", None, "ip2");
        assert!(matches!(
            rejected,
            Err(SweepError::Rejected(AdmissionRejected::ProductThrottled { .. }))
        ));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(service.submit("https://www.shop.example/p/b", None, "ip1").is_ok());
    }

    #[tokio::test]
    async fn test_foreign_url_rejected() {
        let service = service(3, PriceTable::uniform(3), Arc::default());
        let result = service.submit("https://elsewhere.example/p/a", None, "ip1");
        assert!(matches!(result, Err(SweepError::UrlError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_rejects_uncached_products() {
        let service = service(3, PriceTable::uniform(3), Arc::default());

        let cached = service
            .collect_prices("https://www.shop.example/p/cached")
            .await
            .unwrap();
        assert_eq!(cached.priced_count(), 3);

        service
            .collector
            .orchestrator()
            .breaker()
            .trip(Duration::from_secs(600));
        assert_eq!(service.disabled_for(), Some(Duration::from_secs(600)));

        let rejected = service.submit("https://www.shop.example/p/new", None, "ip1");
        assert!(matches!(
            rejected,
            Err(SweepError::Rejected(AdmissionRejected::Disabled { .. }))
        ));
        assert!(matches!(
            service.collect_prices("https://www.shop.example/p/new").await,
            Err(SweepError::Disabled { .. })
        ));

        // Cached products stay available
        let again = service
            .collect_prices("https://www.shop.example/p/cached")
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&cached, &again));
        assert!(service
            .submit("https://www.shop.example/p/cached", None, "ip2")
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimated_wait() {
        let service = service(3, PriceTable::uniform(3), Arc::default());
        let cooldown = Duration::from_secs(300);
        assert_eq!(service.estimated_wait(None), cooldown);

        let first = service
            .submit("https://www.shop.example/p/a", None, "ip1")
            .unwrap();
        let second = service
            .submit("https://www.shop.example/p/b", None, "ip2")
            .unwrap();

        assert_eq!(service.estimated_wait(Some(first.job_id)), cooldown);
        assert_eq!(service.estimated_wait(Some(second.job_id)), cooldown * 2);
        assert_eq!(service.estimated_wait(None), cooldown * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_crawl_recorded_as_unsuccessful() {
        let notifier = Arc::new(RecordingNotifier::default());
        // No branch has a price
        let service = service(2, PriceTable::new(&[]), Arc::clone(&notifier));

        let submission = service
            .submit("https://www.shop.example/p/tv", Some("a@example.com"), "ip1")
            .unwrap();
        let worker = service.start_worker();
        let job = wait_for_completion(&service, submission.job_id).await;

        assert!(!job.success);
        assert!(job.result_body.unwrap().contains("too many errors"));
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);

        service.shutdown();
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_failing_while_disabled_still_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(3, PriceTable::uniform(3), Arc::clone(&notifier));

        let submission = service
            .submit("https://www.shop.example/p/tv", Some("a@example.com"), "ip1")
            .unwrap();
        service
            .collector
            .orchestrator()
            .breaker()
            .trip(Duration::from_secs(600));

        let worker = service.start_worker();
        let job = wait_for_completion(&service, submission.job_id).await;

        assert!(job.is_completed());
        assert!(!job.success);
        assert!(job.result_body.unwrap().contains("disabled"));

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["a@example.com".to_string()]);
        assert!(sent[0].2.contains("disabled"));

        service.shutdown();
        worker.await.unwrap();
    }
}
