//! Integration tests for the price service
//!
//! Interactive lookups go through the result cache; queued jobs go through
//! the worker, the completed-job registry and the notifier.

use crate::{mount_branch, product_page, product_url, shop_config};
use async_trait::async_trait;
use price_sweep::crawler::{HttpSessionFactory, SelectorExtractor};
use price_sweep::jobs::JobStatus;
use price_sweep::output::{Notifier, SendError};
use price_sweep::{CrawlJob, JobId, PriceService};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

#[derive(Default)]
struct CapturingNotifier {
    sent: Mutex<Vec<(Vec<String>, String, String)>>,
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(&self, addresses: &[String], subject: &str, body: &str) -> Result<(), SendError> {
        self.sent.lock().unwrap().push((
            addresses.to_vec(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

async fn shop() -> MockServer {
    let server = MockServer::start().await;
    mount_branch(&server, "e_1", 200, product_page(Some("24,90 €"), false)).await;
    mount_branch(&server, "e_2", 200, product_page(Some("21,50 €"), false)).await;
    server
}

fn service(server: &MockServer, notifier: Arc<CapturingNotifier>) -> PriceService {
    let config = shop_config(&server.uri(), &[("e_1", "Center"), ("e_2", "North")]);
    let extractor = SelectorExtractor::from_config(&config.site.selectors).unwrap();
    PriceService::new(
        &config,
        Arc::new(HttpSessionFactory),
        Arc::new(extractor),
        notifier,
    )
}

async fn wait_for_completion(service: &PriceService, id: JobId) -> CrawlJob {
    for _ in 0..100 {
        if let Some(JobStatus::Completed(job)) = service.job(id) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} did not complete", id);
}

#[tokio::test]
async fn test_interactive_lookup_is_cached() {
    let server = shop().await;
    let service = service(&server, Arc::default());

    let first = service.collect_prices(&product_url(&server)).await.unwrap();
    let second = service
        .collect_prices(&format!("{}/p/television", server.uri()))
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.cheapest().unwrap().branch_id, "e_2");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_crawl() {
    let server = shop().await;
    let service = Arc::new(service(&server, Arc::default()));
    let url = product_url(&server);

    let lookups: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let url = url.clone();
            tokio::spawn(async move { service.collect_prices(&url).await })
        })
        .collect();

    for lookup in lookups {
        let result = lookup.await.unwrap().unwrap();
        assert_eq!(result.priced_count(), 2);
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_queued_job_completes_and_notifies() {
    let server = shop().await;
    let notifier = Arc::new(CapturingNotifier::default());
    let service = service(&server, Arc::clone(&notifier));
    let worker = service.start_worker();

    let submission = service
        .submit(&product_url(&server), Some("buyer@example.com"), "10.0.0.1")
        .unwrap();
    assert!(!submission.merged);

    let job = wait_for_completion(&service, submission.job_id).await;
    assert!(job.success);
    assert_eq!(job.product_name.as_deref(), Some("Television"));
    let body = job.result_body.unwrap();
    assert!(body.contains("21.50€"));
    assert!(body.contains("North"));

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, vec!["buyer@example.com".to_string()]);
    assert!(sent[0].1.contains("Television"));

    assert_eq!(service.recently_completed()[0].id, submission.job_id);

    service.shutdown();
    worker.await.unwrap();
}

#[tokio::test]
async fn test_second_submission_from_same_client_is_throttled() {
    let server = shop().await;
    let service = service(&server, Arc::default());

    service
        .submit(&format!("{}/p/one", server.uri()), None, "10.0.0.1")
        .unwrap();
    let rejected = service.submit(&format!("{}/p/two", server.uri()), None, "10.0.0.1");

    assert!(rejected.is_err());
    assert_eq!(service.queue_depth(), 1);
}

#[tokio::test]
async fn test_foreign_shop_rejected() {
    let server = shop().await;
    let service = service(&server, Arc::default());

    let result = service.submit("https://other-shop.example/p/television", None, "10.0.0.1");

    assert!(result.is_err());
    assert_eq!(service.queue_depth(), 0);
}
