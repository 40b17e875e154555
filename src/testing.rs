//! Fakes shared by the unit tests

use crate::config::{parse_config, Config};
use crate::crawler::{ExtractionError, PageData, PageExtractor, Price, Session, SessionError,
    SessionFactory, SessionOptions};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "https://www.shop.example";

/// Builds a configuration with branches `b01..=bNN`
pub fn config(branches: usize, parallel: u32, max_errors: u32) -> Config {
    let mut toml = format!(
        r#"
[crawler]
max-parallel-requests = {parallel}
retries = 0
max-errors-allowed = {max_errors}

[session]
user-agent = "test"

[site]
base-url = "{BASE_URL}"

[queue]
cooldown-seconds = 300
completed-capacity = 2

[admission]
window-seconds = 60

[branches]
"#
    );
    for i in 1..=branches {
        toml.push_str(&format!("\"b{:02}\" = \"Branch {}\"\n", i, i));
    }
    parse_config(&toml).unwrap()
}

/// Sessions that answer 200 to everything
#[derive(Default)]
pub struct FakeFactory {
    pub launched: AtomicUsize,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn new_session(
        &self,
        _options: &SessionOptions,
    ) -> Result<Box<dyn Session>, SessionError> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession::default()))
    }
}

#[derive(Default)]
pub struct FakeSession {
    current: Mutex<Option<Url>>,
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&self, url: &Url) -> Result<u16, SessionError> {
        *self.current.lock().unwrap() = Some(url.clone());
        Ok(200)
    }

    async fn reload(&self) -> Result<u16, SessionError> {
        Ok(200)
    }

    async fn content(&self) -> Result<String, SessionError> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|url| url.to_string())
            .ok_or(SessionError::NoPage)
    }
}

/// Prices keyed by branch id; missing branches fail extraction
pub struct PriceTable {
    prices: HashMap<String, u64>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl PriceTable {
    pub fn new(prices: &[(&str, u64)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(id, cents)| (id.to_string(), *cents))
                .collect(),
            delay: Duration::from_millis(10),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every branch `b01..=bNN` priced at 10.00
    pub fn uniform(branches: usize) -> Self {
        let ids: Vec<String> = (1..=branches).map(|i| format!("b{:02}", i)).collect();
        let prices: Vec<(&str, u64)> = ids.iter().map(|id| (id.as_str(), 1000)).collect();
        Self::new(&prices)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PageExtractor for PriceTable {
    async fn extract(
        &self,
        _session: &dyn Session,
        url: &Url,
    ) -> Result<PageData, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let branch = url
            .query_pairs()
            .find(|(key, _)| key == "branch_id")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        match self.prices.get(&branch) {
            Some(cents) => Ok(PageData {
                price: Price::from_cents(*cents),
                display_unit: false,
                product_name: Some("Television".to_string()),
                product_image: None,
            }),
            None => Err(ExtractionError::PriceNotFound {
                url: url.to_string(),
            }),
        }
    }
}
