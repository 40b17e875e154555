//! URL handling module for Price-Sweep
//!
//! Every product URL entering the system is normalized once into a
//! [`ProductUrl`]. The normalized form is the key for the result cache, job
//! de-duplication, rate limiting and progress status.

mod normalize;

use std::fmt;
use url::Url;

pub use normalize::normalize_product_url;

/// A product page URL in canonical form: configured scheme and host, no query, no fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductUrl(Url);

impl ProductUrl {
    /// Wraps an already normalized URL
    pub(crate) fn from_normalized(url: Url) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Builds the URL of this product scoped to a single branch
    ///
    /// # Examples
    ///
    /// ```
    /// use price_sweep::url::normalize_product_url;
    ///
    /// let product = normalize_product_url("https://shop.example/p/tv?x=1", "https://www.shop.example").unwrap();
    /// let branch = product.branch_url("branch_id", "e_42");
    /// assert_eq!(branch.as_str(), "https://www.shop.example/p/tv?branch_id=e_42");
    /// ```
    pub fn branch_url(&self, param: &str, branch_id: &str) -> Url {
        let mut url = self.0.clone();
        url.query_pairs_mut().append_pair(param, branch_id);
        url
    }
}

impl fmt::Display for ProductUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for ProductUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
