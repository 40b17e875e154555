use crate::cache::ResultCache;
use crate::crawler::{CrawlOrchestrator, CrawlResult};
use crate::url::ProductUrl;
use crate::SweepError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Serves crawl results through the cache
pub struct PriceCollector {
    orchestrator: Arc<CrawlOrchestrator>,
    cache: Arc<ResultCache>,
}

impl PriceCollector {
    pub fn new(orchestrator: Arc<CrawlOrchestrator>, cache: Arc<ResultCache>) -> Self {
        Self {
            orchestrator,
            cache,
        }
    }

    pub fn orchestrator(&self) -> &Arc<CrawlOrchestrator> {
        &self.orchestrator
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Returns the ranked prices for `product`
    ///
    /// A fresh cached result is always served. Otherwise the product is
    /// crawled, unless crawling is disabled after too many errors.
    ///
    /// # Errors
    ///
    /// * `SweepError::Disabled` - The circuit breaker is open and nothing is cached
    /// * Any crawl error from the orchestrator
    pub async fn collect(
        &self,
        product: &ProductUrl,
        cancel: &CancellationToken,
    ) -> Result<Arc<CrawlResult>, SweepError> {
        let key = product.as_str();

        if let Some(cached) = self.cache.get_fresh(key) {
            tracing::debug!("Serving cached prices for {}", product);
            return Ok(cached);
        }

        if let Some(retry_after) = self.orchestrator.breaker().remaining() {
            return Err(SweepError::Disabled { retry_after });
        }

        self.cache
            .get_or_compute(key, || self.orchestrator.crawl(product, cancel))
            .await
    }
}
