use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Price-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub session: SessionConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// Branch directory in the form (branch id, branch display name)
    #[serde(default)]
    pub branches: BTreeMap<String, String>,
}

/// Fan-out and retry behavior of a single crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of branch pages fetched concurrently (also the session pool size)
    #[serde(rename = "max-parallel-requests")]
    pub max_parallel_requests: u32,

    /// Number of reloads attempted after a non-success navigation
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base delay for rate-limited retries (milliseconds), multiplied by the attempt number
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Branch failures tolerated before remaining branches are skipped
    #[serde(rename = "max-errors-allowed", default = "default_max_errors_allowed")]
    pub max_errors_allowed: u32,

    /// How long new crawls stay disabled after the error threshold was exceeded (minutes)
    #[serde(rename = "disable-minutes", default = "default_disable_minutes")]
    pub disable_minutes: u64,
}

impl CrawlerConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn disable_duration(&self) -> Duration {
        Duration::from_secs(self.disable_minutes * 60)
    }
}

/// Options applied to every browser session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Only load the top-level document
    #[serde(rename = "block-subresources", default = "default_true")]
    pub block_subresources: bool,

    #[serde(rename = "javascript-enabled", default)]
    pub javascript_enabled: bool,

    /// Per-page-load timeout (milliseconds)
    #[serde(rename = "page-load-timeout-ms", default = "default_page_load_timeout_ms")]
    pub page_load_timeout_ms: u64,
}

impl SessionConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }
}

/// The shop being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Canonical scheme and host every product URL is rewritten to
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Query parameter selecting the branch on a product page
    #[serde(rename = "branch-query-param", default = "default_branch_query_param")]
    pub branch_query_param: String,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// CSS selectors used by the default page extractor
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_price_selector")]
    pub price: String,

    #[serde(default = "default_title_selector")]
    pub title: String,

    /// Removed from the end of the page title
    #[serde(rename = "title-suffix", default)]
    pub title_suffix: String,

    #[serde(default = "default_image_selector")]
    pub image: String,

    #[serde(rename = "image-attribute", default = "default_image_attribute")]
    pub image_attribute: String,

    /// Present only when the branch offers a display (floor) unit
    #[serde(rename = "display-unit", default = "default_display_unit_selector")]
    pub display_unit: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            price: default_price_selector(),
            title: default_title_selector(),
            title_suffix: String::new(),
            image: default_image_selector(),
            image_attribute: default_image_attribute(),
            display_unit: default_display_unit_selector(),
        }
    }
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "ttl-minutes", default = "default_cache_ttl_minutes")]
    pub ttl_minutes: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl_minutes(),
        }
    }
}

/// Job queue and worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Minimum wall-clock time between two jobs (seconds)
    #[serde(rename = "cooldown-seconds", default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Number of recently completed jobs kept for polling
    #[serde(rename = "completed-capacity", default = "default_completed_capacity")]
    pub completed_capacity: usize,

    /// Optional SQLite file the completed-job list is mirrored to
    #[serde(rename = "snapshot-path", default)]
    pub snapshot_path: Option<PathBuf>,
}

impl QueueConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            completed_capacity: default_completed_capacity(),
            snapshot_path: None,
        }
    }
}

/// Inbound rate limiting
#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    /// Window during which the same client or product is refused (seconds); 0 disables
    #[serde(rename = "window-seconds", default = "default_admission_window_seconds")]
    pub window_seconds: u64,
}

impl AdmissionConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_admission_window_seconds(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    60_000
}

fn default_max_errors_allowed() -> u32 {
    10
}

fn default_disable_minutes() -> u64 {
    10
}

fn default_page_load_timeout_ms() -> u64 {
    30_000
}

fn default_branch_query_param() -> String {
    "branch_id".to_string()
}

fn default_price_selector() -> String {
    "[itemprop=\"price\"]".to_string()
}

fn default_title_selector() -> String {
    "head title".to_string()
}

fn default_image_selector() -> String {
    ".image-item".to_string()
}

fn default_image_attribute() -> String {
    "data-img".to_string()
}

fn default_display_unit_selector() -> String {
    ".articleExhibit".to_string()
}

fn default_cache_ttl_minutes() -> u64 {
    10
}

fn default_cooldown_seconds() -> u64 {
    300
}

fn default_completed_capacity() -> usize {
    64
}

fn default_admission_window_seconds() -> u64 {
    60
}
