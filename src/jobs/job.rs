use crate::url::ProductUrl;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Opaque job identity
pub type JobId = Uuid;

/// A queued request to crawl one product and report the prices
///
/// Created on admission, completed by exactly one worker pass, then moved
/// into the completed-job registry and never changed again.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub id: JobId,
    pub product_url: ProductUrl,
    /// Addresses notified on completion
    pub contacts: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// At least one branch produced a price
    pub success: bool,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
    /// Rendered result table
    pub result_body: Option<String>,
}

impl CrawlJob {
    pub fn new(product_url: ProductUrl, contact: Option<&str>) -> Self {
        let mut job = Self {
            id: Uuid::new_v4(),
            product_url,
            contacts: BTreeSet::new(),
            created_at: Utc::now(),
            completed_at: None,
            success: false,
            product_name: None,
            product_image: None,
            result_body: None,
        };
        if let Some(contact) = contact {
            job.add_contact(contact);
        }
        job
    }

    /// Adds a contact address; blank addresses are ignored
    ///
    /// Returns `true` if the address was not already present.
    pub fn add_contact(&mut self, contact: &str) -> bool {
        let contact = contact.trim();
        if contact.is_empty() {
            return false;
        }
        self.contacts.insert(contact.to_string())
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Name shown to users: the product name once known, the URL before
    pub fn display_name(&self) -> &str {
        self.product_name
            .as_deref()
            .unwrap_or_else(|| self.product_url.as_str())
    }
}

/// Where a job currently is
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Waiting in the queue; 0 means next in line
    Pending { position: usize },
    /// Being processed by the worker
    Running,
    Completed(CrawlJob),
}
