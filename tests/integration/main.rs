//! End-to-end tests against mock shop servers
//!
//! Each test starts a wiremock server standing in for the shop and crawls it
//! through the real HTTP sessions and selector extraction.

mod crawl_tests;
mod service_tests;

use price_sweep::config::{parse_config, Config};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PRODUCT_PATH: &str = "/p/television";

/// A configuration for `base_url` with the given branches
pub fn shop_config(base_url: &str, branches: &[(&str, &str)]) -> Config {
    let mut toml = format!(
        r#"
[crawler]
max-parallel-requests = 2
retries = 2
retry-base-delay-ms = 20
max-errors-allowed = 5

[session]
user-agent = "PriceSweepTest/1.0"
page-load-timeout-ms = 5000

[site]
base-url = "{base_url}"

[site.selectors]
title-suffix = " | Shop"

[queue]
cooldown-seconds = 0

[branches]
"#
    );
    for (id, name) in branches {
        toml.push_str(&format!("\"{}\" = \"{}\"\n", id, name));
    }
    parse_config(&toml).expect("test configuration should parse")
}

/// A product page, with a price element only when `price` is set
pub fn product_page(price: Option<&str>, display_unit: bool) -> String {
    let price = price
        .map(|p| format!(r#"<span itemprop="price">{}</span>"#, p))
        .unwrap_or_default();
    let exhibit = if display_unit {
        r#"<div class="articleExhibit">Display unit</div>"#
    } else {
        ""
    };
    format!(
        r#"<html>
<head><title>Television | Shop</title></head>
<body>
<div class="image-item" data-img="https://img.shop.example/tv.jpg"></div>
{price}
{exhibit}
</body>
</html>"#
    )
}

/// Serves `body` with `status` for one branch of the product page
pub async fn mount_branch(server: &MockServer, branch: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .and(query_param("branch_id", branch))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Product URL as a client would submit it
pub fn product_url(server: &MockServer) -> String {
    format!("{}{}/?utm_source=mail#reviews", server.uri(), PRODUCT_PATH)
}
