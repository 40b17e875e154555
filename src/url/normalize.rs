use crate::url::ProductUrl;
use crate::UrlError;
use url::Url;

/// Normalizes a product URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme
/// 3. Require the host to be the configured shop host (case and a leading
///    `www.` are ignored)
/// 4. Rewrite scheme and host to the configured base URL
/// 5. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes and remove trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Remove the query string (branch selection and tracking parameters)
/// 7. Remove fragment
///
/// # Arguments
///
/// * `url_str` - The URL string submitted by a client
/// * `base_url` - The configured canonical scheme and host
///
/// # Returns
///
/// * `Ok(ProductUrl)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use price_sweep::url::normalize_product_url;
///
/// let url = normalize_product_url(
///     "http://SHOP.EXAMPLE/tv/123/?branch_id=e_1#reviews",
///     "https://www.shop.example",
/// ).unwrap();
/// assert_eq!(url.as_str(), "https://www.shop.example/tv/123");
/// ```
pub fn normalize_product_url(url_str: &str, base_url: &str) -> Result<ProductUrl, UrlError> {
    let input = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if input.scheme() != "http" && input.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            input.scheme()
        )));
    }

    let host = input.host_str().ok_or(UrlError::MissingDomain)?;

    let mut canonical = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
    let canonical_host = canonical.host_str().ok_or(UrlError::MissingDomain)?;

    if bare_host(host) != bare_host(canonical_host) {
        return Err(UrlError::Malformed(format!(
            "{} is not a product page on {}",
            url_str, canonical_host
        )));
    }

    canonical.set_path(&normalize_path(input.path()));
    canonical.set_query(None);
    canonical.set_fragment(None);

    Ok(ProductUrl::from_normalized(canonical))
}

/// Lowercases a host and drops a leading `www.`
fn bare_host(host: &str) -> String {
    let lower = host.to_lowercase();
    match lower.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}
