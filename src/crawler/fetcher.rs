//! Per-branch price retrieval
//!
//! This module drives one branch page through a lent session:
//! - Navigation with retry on non-200 responses
//! - Linear backoff on 429 (base delay × attempt)
//! - Retry of navigation timeouts
//! - Extraction of the price once the page loaded
//!
//! Every failure is branch-local: the fetcher always produces a
//! [`BranchResult`], never a crawl-level error.

use crate::crawler::extractor::{ExtractionError, PageExtractor};
use crate::crawler::result::{Branch, BranchPrice, BranchResult};
use crate::crawler::session::{Session, SessionError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const STATUS_OK: u16 = 200;
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Why a branch has no price
#[derive(Debug, Clone, Error)]
pub enum BranchError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Giving up after {attempts} attempts, last status {status}")]
    Exhausted { status: u16, attempts: u32 },

    #[error("Navigation failed: {0}")]
    Navigation(#[from] SessionError),

    #[error("No browser session available")]
    PoolExhausted,
}

/// Outcome of fetching one branch
#[derive(Debug, Clone)]
pub struct FetchedBranch {
    pub result: BranchResult,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
}

impl FetchedBranch {
    /// A branch that produced no price
    pub fn failed(branch: &Branch, url: Url, error: BranchError) -> Self {
        Self {
            result: BranchResult {
                branch_id: branch.id.clone(),
                branch_name: branch.name.clone(),
                price: BranchPrice::Unavailable(error),
                url,
                display_unit: false,
            },
            product_name: None,
            product_image: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.result.price.is_priced()
    }
}

/// Fetches branch pages with the retry protocol
pub struct BranchFetcher {
    extractor: Arc<dyn PageExtractor>,
    retries: u32,
    retry_base_delay: Duration,
}

impl BranchFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `extractor` - Reads the price from a loaded page
    /// * `retries` - Additional attempts after the first navigation
    /// * `retry_base_delay` - Backoff unit applied on 429 responses
    pub fn new(extractor: Arc<dyn PageExtractor>, retries: u32, retry_base_delay: Duration) -> Self {
        Self {
            extractor,
            retries,
            retry_base_delay,
        }
    }

    /// Fetches the price for `branch` from `url`
    pub async fn fetch(&self, session: &dyn Session, branch: &Branch, url: Url) -> FetchedBranch {
        if let Err(e) = self.load(session, &url).await {
            tracing::warn!("Branch {} failed: {}", branch.id, e);
            return FetchedBranch::failed(branch, url, e);
        }

        match self.extractor.extract(session, &url).await {
            Ok(data) => {
                tracing::debug!("Branch {}: {}", branch.id, data.price);
                FetchedBranch {
                    result: BranchResult {
                        branch_id: branch.id.clone(),
                        branch_name: branch.name.clone(),
                        price: BranchPrice::Priced(data.price),
                        url,
                        display_unit: data.display_unit,
                    },
                    product_name: data.product_name,
                    product_image: data.product_image,
                }
            }
            Err(e) => {
                tracing::warn!("Branch {} failed: {}", branch.id, e);
                FetchedBranch::failed(branch, url, BranchError::Extraction(e))
            }
        }
    }

    /// Navigates until the page answers 200 or retries run out
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Done |
    /// | HTTP 429 | Sleep base delay × attempt, then reload |
    /// | Other status | Reload immediately |
    /// | Timeout | Navigate again |
    /// | Other navigation error | Immediate failure |
    async fn load(&self, session: &dyn Session, url: &Url) -> Result<(), BranchError> {
        tracing::debug!("Navigating to {}", url);
        let mut outcome = session.goto(url).await;
        let mut attempt = 0;

        loop {
            let page_loaded = match outcome {
                Ok(STATUS_OK) => return Ok(()),
                Ok(status) if attempt < self.retries => {
                    attempt += 1;
                    if status == STATUS_TOO_MANY_REQUESTS {
                        let delay = self.retry_base_delay * attempt;
                        tracing::debug!(
                            "Rate limited on {}, waiting {:?} before attempt {}",
                            url,
                            delay,
                            attempt + 1
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        tracing::debug!("Status {} on {}, reloading", status, url);
                    }
                    true
                }
                Ok(status) => {
                    return Err(BranchError::Exhausted {
                        status,
                        attempts: attempt + 1,
                    })
                }
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!("{}, retrying", e);
                    false
                }
                Err(e) => return Err(BranchError::Navigation(e)),
            };

            outcome = if page_loaded {
                session.reload().await
            } else {
                session.goto(url).await
            };
        }
    }
}
