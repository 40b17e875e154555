//! Job queue module for Price-Sweep
//!
//! Queued crawl requests flow through three stages:
//! - `JobQueue`: pending jobs in FIFO order
//! - `Worker`: the single consumer processing one job at a time
//! - `CompletedJobRegistry`: the bounded list of recently completed jobs

mod job;
mod queue;
mod registry;
mod worker;

pub use job::{CrawlJob, JobId, JobStatus};
pub use queue::JobQueue;
pub use registry::CompletedJobRegistry;
pub use worker::{JobHandler, Worker};
