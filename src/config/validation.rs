use crate::config::types::{
    Config, CrawlerConfig, QueueConfig, SelectorConfig, SessionConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::BTreeMap;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_session_config(&config.session)?;
    validate_site_config(&config.site)?;
    validate_queue_config(&config.queue)?;
    validate_branches(&config.branches)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_parallel_requests < 1 || config.max_parallel_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_parallel_requests must be between 1 and 100, got {}",
            config.max_parallel_requests
        )));
    }

    if config.retries > 20 {
        return Err(ConfigError::Validation(format!(
            "retries must be <= 20, got {}",
            config.retries
        )));
    }

    Ok(())
}

/// Validates session options
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.page_load_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_load_timeout_ms must be >= 100ms, got {}ms",
            config.page_load_timeout_ms
        )));
    }

    Ok(())
}

/// Validates the site definition and its selectors
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    if config.branch_query_param.is_empty()
        || !config
            .branch_query_param
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "branch_query_param must be a non-empty identifier, got '{}'",
            config.branch_query_param
        )));
    }

    validate_selectors(&config.selectors)
}

/// Validates that every configured CSS selector parses
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in [
        ("price", &selectors.price),
        ("title", &selectors.title),
        ("image", &selectors.image),
        ("display-unit", &selectors.display_unit),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, selector, e))
        })?;
    }
    Ok(())
}

/// Validates queue configuration
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.completed_capacity < 1 {
        return Err(ConfigError::Validation(
            "completed_capacity must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates the branch directory
fn validate_branches(branches: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    if branches.is_empty() {
        return Err(ConfigError::Validation(
            "at least one branch must be configured".to_string(),
        ));
    }

    for (id, name) in branches {
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "branch ids cannot be empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "branch '{}' has an empty name",
                id
            )));
        }
    }

    Ok(())
}
