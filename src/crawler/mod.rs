//! Crawler module for branch price retrieval
//!
//! This module contains the crawl core, including:
//! - Browser sessions and the per-crawl session pool
//! - Per-branch fetching with retry and backoff
//! - Page extraction behind the `PageExtractor` capability
//! - The orchestrator fanning a product out over all branches

mod coordinator;
mod extractor;
mod fetcher;
mod http_session;
mod result;
mod session;

pub use coordinator::CrawlOrchestrator;
pub use extractor::{ExtractionError, PageData, PageExtractor, SelectorExtractor};
pub use fetcher::{BranchError, BranchFetcher, FetchedBranch};
pub use http_session::{build_http_client, HttpSession, HttpSessionFactory};
pub use result::{Branch, BranchDirectory, BranchPrice, BranchResult, CrawlResult, Price};
pub use session::{PooledSession, Session, SessionError, SessionFactory, SessionOptions, SessionPool};
