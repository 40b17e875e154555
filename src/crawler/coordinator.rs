//! Crawl orchestration
//!
//! One crawl fans a product URL out to every configured branch:
//! - A pool of `P` sessions is launched for the crawl and closed after it
//! - At most `P` branch tasks run at once (semaphore permits)
//! - Each task borrows a session, fetches its branch, and returns the session
//! - A shared error counter stops new branch tasks once it passes the
//!   configured maximum, and then trips the circuit breaker
//! - Progress is published to the status tracker after every branch

use crate::config::Config;
use crate::crawler::extractor::PageExtractor;
use crate::crawler::fetcher::{BranchError, BranchFetcher, FetchedBranch};
use crate::crawler::result::{BranchDirectory, CrawlResult};
use crate::crawler::session::{SessionFactory, SessionOptions, SessionPool};
use crate::state::{CircuitBreaker, StatusTracker};
use crate::url::ProductUrl;
use crate::SweepError;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Fans a product crawl out over all branches
pub struct CrawlOrchestrator {
    factory: Arc<dyn SessionFactory>,
    fetcher: Arc<BranchFetcher>,
    branches: Arc<BranchDirectory>,
    session_options: SessionOptions,
    branch_param: String,
    max_parallel: usize,
    max_errors_allowed: u32,
    disable_duration: Duration,
    breaker: Arc<CircuitBreaker>,
    status: Arc<StatusTracker>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `factory` - Creates the browser sessions for each crawl
    /// * `extractor` - Reads prices from loaded branch pages
    /// * `breaker` - Shared circuit breaker, tripped after too many errors
    /// * `status` - Shared progress tracker
    pub fn new(
        config: &Config,
        factory: Arc<dyn SessionFactory>,
        extractor: Arc<dyn PageExtractor>,
        breaker: Arc<CircuitBreaker>,
        status: Arc<StatusTracker>,
    ) -> Self {
        let fetcher = BranchFetcher::new(
            extractor,
            config.crawler.retries,
            config.crawler.retry_base_delay(),
        );

        Self {
            factory,
            fetcher: Arc::new(fetcher),
            branches: Arc::new(BranchDirectory::from_map(&config.branches)),
            session_options: SessionOptions::from_config(&config.session),
            branch_param: config.site.branch_query_param.clone(),
            max_parallel: config.crawler.max_parallel_requests.max(1) as usize,
            max_errors_allowed: config.crawler.max_errors_allowed,
            disable_duration: config.crawler.disable_duration(),
            breaker,
            status,
        }
    }

    pub fn branches(&self) -> &BranchDirectory {
        &self.branches
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn status(&self) -> &Arc<StatusTracker> {
        &self.status
    }

    /// Crawls every branch for `product`
    ///
    /// Branch failures never fail the crawl; they are reported as
    /// unavailable entries. Branches skipped after cancellation or after the
    /// error threshold was passed are absent from the result.
    ///
    /// # Errors
    ///
    /// * `SweepError::NoSessions` - Not a single session could be launched
    pub async fn crawl(
        &self,
        product: &ProductUrl,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult, SweepError> {
        let total = self.branches.len();
        let tracked = self.status.track(product.as_str(), total);
        let generation = tracked.generation();

        tracing::info!("Crawling {} across {} branches", product, total);
        let started = tokio::time::Instant::now();

        let pool = SessionPool::launch(&*self.factory, &self.session_options, self.max_parallel)
            .await
            .map_err(|e| {
                tracing::error!("Could not launch sessions for {}: {}", product, e);
                SweepError::NoSessions {
                    url: product.to_string(),
                }
            })?;
        let pool = Arc::new(pool);

        let permits = Arc::new(Semaphore::new(pool.size()));
        let errors = Arc::new(AtomicU32::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for branch in self.branches.iter() {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            if cancel.is_cancelled() {
                tracing::info!("Crawl of {} cancelled, skipping remaining branches", product);
                break;
            }
            if errors.load(Ordering::SeqCst) > self.max_errors_allowed {
                tracing::warn!(
                    "Too many errors crawling {}, skipping remaining branches",
                    product
                );
                break;
            }

            let branch = branch.clone();
            let url = product.branch_url(&self.branch_param, &branch.id);
            let pool = Arc::clone(&pool);
            let fetcher = Arc::clone(&self.fetcher);
            let status = Arc::clone(&self.status);
            let errors = Arc::clone(&errors);
            let done = Arc::clone(&done);
            let key = product.to_string();

            tasks.spawn(async move {
                // Released last, after the counters below are updated
                let _permit = permit;

                let fetched = match pool.try_acquire() {
                    Some(session) => fetcher.fetch(&*session, &branch, url).await,
                    None => {
                        tracing::warn!("Branch {} failed: session pool exhausted", branch.id);
                        FetchedBranch::failed(&branch, url, BranchError::PoolExhausted)
                    }
                };

                if fetched.is_failure() {
                    errors.fetch_add(1, Ordering::SeqCst);
                }
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                status.set_progress(&key, generation, finished, total);

                fetched
            });
        }

        let mut results = Vec::with_capacity(total);
        let mut product_name = None;
        let mut product_image = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(fetched) => {
                    if product_name.is_none() {
                        product_name = fetched.product_name;
                    }
                    if product_image.is_none() {
                        product_image = fetched.product_image;
                    }
                    results.push(fetched.result);
                }
                Err(e) => {
                    tracing::error!("Branch task for {} aborted: {}", product, e);
                    errors.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        pool.close().await;

        let error_count = errors.load(Ordering::SeqCst);
        if error_count > self.max_errors_allowed {
            tracing::warn!(
                "{} branch errors crawling {} (maximum {})",
                error_count,
                product,
                self.max_errors_allowed
            );
            self.breaker.trip(self.disable_duration);
        }

        let result = CrawlResult::new(
            product.clone(),
            results,
            product_name,
            product_image,
            error_count,
            total,
        );

        tracing::info!(
            "Crawl of {} finished in {:.1}s: {}/{} branches priced",
            product,
            started.elapsed().as_secs_f64(),
            result.priced_count(),
            total
        );

        Ok(result)
    }
}
