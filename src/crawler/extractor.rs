//! Page extraction
//!
//! The crawl core treats extraction as an opaque capability: given a session
//! with a branch page loaded, produce the price and a few product details.
//! [`SelectorExtractor`] is the default implementation driven by the CSS
//! selectors in the site configuration.

use crate::config::SelectorConfig;
use crate::crawler::result::Price;
use crate::crawler::session::{Session, SessionError};
use crate::ConfigError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Data read from one branch page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageData {
    pub price: Price,
    /// The branch sells a display (floor) unit
    pub display_unit: bool,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
}

/// Errors raised while reading a loaded page
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Price element not found on {url}")]
    PriceNotFound { url: String },

    #[error("Unparseable price '{text}' on {url}")]
    InvalidPrice { url: String, text: String },

    #[error("Could not read page content: {0}")]
    Session(#[from] SessionError),
}

/// Turns a loaded branch page into [`PageData`]
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, session: &dyn Session, url: &Url)
        -> Result<PageData, ExtractionError>;
}

/// Extracts page data with CSS selectors
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    price: Selector,
    title: Selector,
    title_suffix: String,
    image: Selector,
    image_attribute: String,
    display_unit: Selector,
}

impl SelectorExtractor {
    /// Compiles the configured selectors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSelector` naming the first selector that
    /// fails to parse.
    pub fn from_config(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            price: compile(&config.price)?,
            title: compile(&config.title)?,
            title_suffix: config.title_suffix.clone(),
            image: compile(&config.image)?,
            image_attribute: config.image_attribute.clone(),
            display_unit: compile(&config.display_unit)?,
        })
    }

    /// Reads page data out of an HTML document
    pub fn parse(&self, html: &str, url: &Url) -> Result<PageData, ExtractionError> {
        let document = Html::parse_document(html);

        let price_text = document
            .select(&self.price)
            .next()
            .map(|element| {
                // Structured data carries the price in `content`
                element
                    .value()
                    .attr("content")
                    .map(str::to_string)
                    .unwrap_or_else(|| element.text().collect::<String>())
            })
            .ok_or_else(|| ExtractionError::PriceNotFound {
                url: url.to_string(),
            })?;

        let price = Price::parse(&price_text).ok_or_else(|| ExtractionError::InvalidPrice {
            url: url.to_string(),
            text: price_text.trim().to_string(),
        })?;

        Ok(PageData {
            price,
            display_unit: document.select(&self.display_unit).next().is_some(),
            product_name: self.extract_title(&document),
            product_image: self.extract_image(&document),
        })
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        document
            .select(&self.title)
            .next()
            .map(|element| element.text().collect::<String>())
            .map(|title| {
                let title = title.trim();
                if self.title_suffix.is_empty() {
                    title.to_string()
                } else {
                    title.replace(&self.title_suffix, "").trim().to_string()
                }
            })
            .filter(|s| !s.is_empty())
    }

    fn extract_image(&self, document: &Html) -> Option<String> {
        document
            .select(&self.image)
            .next()
            .and_then(|element| element.value().attr(&self.image_attribute))
            .map(|src| src.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl PageExtractor for SelectorExtractor {
    async fn extract(
        &self,
        session: &dyn Session,
        url: &Url,
    ) -> Result<PageData, ExtractionError> {
        let html = session.content().await?;
        self.parse(&html, url)
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SelectorExtractor {
        let config = SelectorConfig {
            title_suffix: "| Shop Example".to_string(),
            ..SelectorConfig::default()
        };
        SelectorExtractor::from_config(&config).unwrap()
    }

    fn url() -> Url {
        Url::parse("https://www.shop.example/p/1?branch_id=e_1").unwrap()
    }

    const PAGE: &str = r#"
        <html>
          <head><title>Sony TV 55" | Shop Example</title></head>
          <body>
            <span itemprop="price" content="1299.00">1.299,00 €</span>
            <div class="image-item" data-img="https://cdn.shop.example/tv.jpg"></div>
            <div class="articleExhibit">Display unit</div>
          </body>
        </html>
    "#;

    #[test]
    fn test_parse_full_page() {
        let data = extractor().parse(PAGE, &url()).unwrap();
        assert_eq!(data.price, Price::from_cents(129_900));
        assert!(data.display_unit);
        assert_eq!(data.product_name.as_deref(), Some("Sony TV 55\""));
        assert_eq!(
            data.product_image.as_deref(),
            Some("https://cdn.shop.example/tv.jpg")
        );
    }

    #[test]
    fn test_price_from_text_without_content_attribute() {
        let html = r#"<html><body><span itemprop="price">19,99 €</span></body></html>"#;
        let data = extractor().parse(html, &url()).unwrap();
        assert_eq!(data.price, Price::from_cents(1999));
        assert!(!data.display_unit);
        assert!(data.product_name.is_none());
        assert!(data.product_image.is_none());
    }

    #[test]
    fn test_missing_price() {
        let html = "<html><body><p>Sold out</p></body></html>";
        let result = extractor().parse(html, &url());
        assert!(matches!(result, Err(ExtractionError::PriceNotFound { .. })));
    }

    #[test]
    fn test_unparseable_price() {
        let html = r#"<html><body><span itemprop="price">call us</span></body></html>"#;
        let result = extractor().parse(html, &url());
        assert!(matches!(result, Err(ExtractionError::InvalidPrice { .. })));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let config = SelectorConfig {
            price: "[[".to_string(),
            ..SelectorConfig::default()
        };
        assert!(matches!(
            SelectorExtractor::from_config(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }
}
