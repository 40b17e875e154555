//! Integration tests for the crawler
//!
//! These tests drive the orchestrator with real HTTP sessions against a
//! mock shop and check the full branch fan-out end-to-end.

use crate::{mount_branch, product_page, product_url, shop_config};
use price_sweep::config::Config;
use price_sweep::crawler::{CrawlOrchestrator, HttpSessionFactory, SelectorExtractor};
use price_sweep::state::{CircuitBreaker, StatusTracker};
use price_sweep::{normalize_product_url, BranchPrice, Price, ProductUrl};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator(config: &Config) -> CrawlOrchestrator {
    let extractor = SelectorExtractor::from_config(&config.site.selectors).unwrap();
    CrawlOrchestrator::new(
        config,
        Arc::new(HttpSessionFactory),
        Arc::new(extractor),
        Arc::new(CircuitBreaker::new()),
        Arc::new(StatusTracker::new()),
    )
}

fn product(server: &MockServer, config: &Config) -> ProductUrl {
    normalize_product_url(&product_url(server), &config.site.base_url).unwrap()
}

#[tokio::test]
async fn test_branches_ranked_by_price() {
    let server = MockServer::start().await;
    mount_branch(&server, "e_1", 200, product_page(Some("19,99 €"), false)).await;
    mount_branch(&server, "e_2", 200, product_page(Some("15,00 €"), true)).await;
    mount_branch(&server, "e_3", 200, product_page(None, false)).await;

    let config = shop_config(
        &server.uri(),
        &[("e_1", "Center"), ("e_2", "North"), ("e_3", "South")],
    );
    let orchestrator = orchestrator(&config);

    let result = orchestrator
        .crawl(&product(&server, &config), &CancellationToken::new())
        .await
        .unwrap();

    let order: Vec<&str> = result.branches.iter().map(|b| b.branch_id.as_str()).collect();
    assert_eq!(order, vec!["e_2", "e_1", "e_3"]);

    assert_eq!(result.branches[0].price.price(), Some(Price::from_cents(1500)));
    assert!(result.branches[0].display_unit);
    assert_eq!(result.branches[0].branch_name, "North");
    assert_eq!(result.branches[2].price_label(), "N/A");

    assert_eq!(result.product_name.as_deref(), Some("Television"));
    assert_eq!(
        result.product_image.as_deref(),
        Some("https://img.shop.example/tv.jpg")
    );
    assert_eq!(result.error_count, 1);
    assert!(!orchestrator.breaker().is_open());
}

#[tokio::test]
async fn test_branch_urls_carry_branch_parameter() {
    let server = MockServer::start().await;
    mount_branch(&server, "e_7", 200, product_page(Some("5,00"), false)).await;

    let config = shop_config(&server.uri(), &[("e_7", "Harbour")]);
    let result = orchestrator(&config)
        .crawl(&product(&server, &config), &CancellationToken::new())
        .await
        .unwrap();

    // Tracking parameters and the fragment are gone, the branch is selected
    assert_eq!(
        result.branches[0].url.as_str(),
        format!("{}/p/television?branch_id=e_7", server.uri())
    );
}

#[tokio::test]
async fn test_rate_limited_branch_is_retried() {
    let server = MockServer::start().await;

    // The first request is throttled, later ones succeed
    Mock::given(method("GET"))
        .and(path(crate::PRODUCT_PATH))
        .and(query_param("branch_id", "e_1"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_branch(&server, "e_1", 200, product_page(Some("49,-"), false)).await;

    let config = shop_config(&server.uri(), &[("e_1", "Center")]);
    let result = orchestrator(&config)
        .crawl(&product(&server, &config), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.branches[0].price.price(), Some(Price::from_cents(4900)));
    assert_eq!(result.error_count, 0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_persistent_server_errors_mark_branch_unavailable() {
    let server = MockServer::start().await;
    mount_branch(&server, "e_1", 503, String::new()).await;
    mount_branch(&server, "e_2", 200, product_page(Some("10,00"), false)).await;

    let config = shop_config(&server.uri(), &[("e_1", "Center"), ("e_2", "North")]);
    let result = orchestrator(&config)
        .crawl(&product(&server, &config), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.branches[0].branch_id, "e_2");
    assert!(matches!(
        result.branches[1].price,
        BranchPrice::Unavailable(_)
    ));
    assert_eq!(result.error_count, 1);

    // One navigation plus two reloads for the failing branch
    let failing = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.query() == Some("branch_id=e_1"))
        .count();
    assert_eq!(failing, 3);
}

#[tokio::test]
async fn test_unreachable_shop_trips_breaker() {
    let server = MockServer::start().await;
    let config = {
        let branches: Vec<(String, String)> = (1..=8)
            .map(|i| (format!("e_{}", i), format!("Branch {}", i)))
            .collect();
        let refs: Vec<(&str, &str)> = branches
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        shop_config(&server.uri(), &refs)
    };
    // Nothing mounted: every branch answers 404
    let orchestrator = orchestrator(&config);

    let result = orchestrator
        .crawl(&product(&server, &config), &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.all_failed());
    assert!(result.error_count > config.crawler.max_errors_allowed);
    assert!(result.skipped_count() > 0);
    assert!(orchestrator.breaker().is_open());
}
