use crate::jobs::{CrawlJob, JobHandler};
use crate::output::{escape_html, notification_subject, render_email_body, render_result_table, Notifier};
use crate::service::PriceCollector;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a queued job: collect prices, render them, notify the contacts
pub struct CrawlJobHandler {
    collector: Arc<PriceCollector>,
    notifier: Arc<dyn Notifier>,
    cancel: CancellationToken,
}

impl CrawlJobHandler {
    pub fn new(
        collector: Arc<PriceCollector>,
        notifier: Arc<dyn Notifier>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collector,
            notifier,
            cancel,
        }
    }
}

#[async_trait]
impl JobHandler for CrawlJobHandler {
    async fn handle(&self, mut job: CrawlJob) -> CrawlJob {
        let outcome = self.collector.collect(&job.product_url, &self.cancel).await;
        let completed_at = Utc::now();
        job.completed_at = Some(completed_at);

        let body = match outcome {
            Ok(result) => {
                job.success = result.has_prices();
                job.product_name = result.product_name.clone();
                job.product_image = result.product_image.clone();
                job.result_body = Some(render_result_table(&result));
                render_email_body(&job, &result, completed_at)
            }
            Err(e) => {
                tracing::error!("Job {} for {} failed: {}", job.id, job.product_url, e);
                job.success = false;
                let message = format!("<p>{}</p>", escape_html(&e.to_string()));
                job.result_body = Some(message.clone());
                message
            }
        };

        self.notify(&job, &body).await;
        job
    }
}

impl CrawlJobHandler {
    /// Sends `body` to every contact of a completed job
    async fn notify(&self, job: &CrawlJob, body: &str) {
        if job.contacts.is_empty() {
            return;
        }

        let addresses: Vec<String> = job.contacts.iter().cloned().collect();
        let subject = notification_subject(job.display_name());
        match self.notifier.send(&addresses, &subject, body).await {
            Ok(()) => tracing::info!("Sent result of job {} to {}", job.id, addresses.join(", ")),
            Err(e) => tracing::warn!("Could not send result of job {}: {}", job.id, e),
        }
    }
}
