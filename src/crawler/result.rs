//! Crawl result types
//!
//! A crawl produces one [`BranchResult`] per attempted branch. Results are
//! ranked by price with unavailable prices last and the branch id as the
//! tie-break, so the output order never depends on completion order.

use crate::crawler::BranchError;
use crate::url::ProductUrl;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// A price in the shop's currency, held as integer cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    /// Parses the first number found in a price text
    ///
    /// Both `1.299,00` and `1,299.00` are understood: the last separator is
    /// the decimal point when it is followed by one or two digits, every
    /// other separator groups thousands.
    ///
    /// # Examples
    ///
    /// ```
    /// use price_sweep::Price;
    ///
    /// assert_eq!(Price::parse("ab 1.299,00 €"), Some(Price::from_cents(129_900)));
    /// assert_eq!(Price::parse("19.99"), Some(Price::from_cents(1_999)));
    /// assert_eq!(Price::parse("49,-"), Some(Price::from_cents(4_900)));
    /// assert_eq!(Price::parse("n/a"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find(|c: char| c.is_ascii_digit())?;
        let number: &str = {
            let rest = &text[start..];
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
                .unwrap_or(rest.len());
            rest[..end].trim_end_matches([',', '.'])
        };

        let (integer, fraction) = match number.rfind([',', '.']) {
            Some(pos) if (1..=2).contains(&(number.len() - pos - 1)) => {
                (&number[..pos], &number[pos + 1..])
            }
            _ => (number, ""),
        };

        let units: u64 = integer
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok()?;
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().ok()? * 10,
            _ => fraction.parse::<u64>().ok()?,
        };

        units.checked_mul(100)?.checked_add(cents).map(Self::from_cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}€", self.cents / 100, self.cents % 100)
    }
}

/// Outcome of one branch's price lookup
#[derive(Debug, Clone)]
pub enum BranchPrice {
    Priced(Price),
    Unavailable(BranchError),
}

impl BranchPrice {
    pub fn price(&self) -> Option<Price> {
        match self {
            Self::Priced(price) => Some(*price),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_priced(&self) -> bool {
        matches!(self, Self::Priced(_))
    }

    /// Orders priced entries ascending and unavailable entries after all of them
    pub fn rank(&self, other: &Self) -> Ordering {
        match (self.price(), other.price()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// The price of a product at one branch
#[derive(Debug, Clone)]
pub struct BranchResult {
    pub branch_id: String,
    pub branch_name: String,
    pub price: BranchPrice,
    /// Direct link to the product page scoped to this branch
    pub url: Url,
    /// The branch sells a display (floor) unit
    pub display_unit: bool,
}

impl BranchResult {
    /// Price text shown to users
    pub fn price_label(&self) -> String {
        match &self.price {
            BranchPrice::Priced(price) => price.to_string(),
            BranchPrice::Unavailable(_) => "N/A".to_string(),
        }
    }

    /// Ranking order: price ascending, unavailable last, then branch id
    pub fn ranking(&self, other: &Self) -> Ordering {
        self.price
            .rank(&other.price)
            .then_with(|| self.branch_id.cmp(&other.branch_id))
    }
}

/// Aggregated result of one crawl
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub product_url: ProductUrl,
    /// Ranked by [`BranchResult::ranking`]
    pub branches: Vec<BranchResult>,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
    /// Number of branch failures during the crawl
    pub error_count: u32,
    /// Number of branches configured when the crawl started
    pub branches_total: usize,
}

impl CrawlResult {
    /// Builds a result, ranking the branch results
    pub fn new(
        product_url: ProductUrl,
        mut branches: Vec<BranchResult>,
        product_name: Option<String>,
        product_image: Option<String>,
        error_count: u32,
        branches_total: usize,
    ) -> Self {
        branches.sort_by(BranchResult::ranking);
        Self {
            product_url,
            branches,
            product_name,
            product_image,
            error_count,
            branches_total,
        }
    }

    pub fn priced_count(&self) -> usize {
        self.branches.iter().filter(|b| b.price.is_priced()).count()
    }

    pub fn has_prices(&self) -> bool {
        self.priced_count() > 0
    }

    /// No attempted branch produced a price
    pub fn all_failed(&self) -> bool {
        !self.has_prices()
    }

    pub fn cheapest(&self) -> Option<&BranchResult> {
        self.branches.first().filter(|b| b.price.is_priced())
    }

    /// Branches skipped because the error threshold was exceeded
    pub fn skipped_count(&self) -> usize {
        self.branches_total.saturating_sub(self.branches.len())
    }
}

/// A physical store location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

/// Static branch id → name mapping, read-only after startup
#[derive(Debug, Clone, Default)]
pub struct BranchDirectory {
    branches: Vec<Branch>,
}

impl BranchDirectory {
    pub fn new(branches: Vec<Branch>) -> Self {
        Self { branches }
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self::new(
            map.iter()
                .map(|(id, name)| Branch {
                    id: id.clone(),
                    name: name.clone(),
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}
