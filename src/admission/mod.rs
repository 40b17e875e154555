//! Admission control for job submissions
//!
//! Submissions are rate limited twice: once per requester identity and once
//! per normalized product URL. Each key is blocked for the configured window
//! after an admitted submission.

mod denylist;

pub use denylist::TtlDenylist;

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Why a submission was turned away
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionRejected {
    #[error("Too many requests from this client, try again in {}s", retry_after.as_secs().max(1))]
    ClientThrottled { retry_after: Duration },

    #[error("This product was requested recently, try again in {}s", retry_after.as_secs().max(1))]
    ProductThrottled { retry_after: Duration },

    #[error("Crawling is paused after too many errors, try again in {}s", retry_after.as_secs().max(1))]
    Disabled { retry_after: Duration },
}

impl AdmissionRejected {
    pub fn retry_after(&self) -> Duration {
        match self {
            Self::ClientThrottled { retry_after }
            | Self::ProductThrottled { retry_after }
            | Self::Disabled { retry_after } => *retry_after,
        }
    }
}

#[derive(Debug, Default)]
struct Denylists {
    clients: TtlDenylist,
    products: TtlDenylist,
}

/// Per-client and per-product rate limiter
#[derive(Debug)]
pub struct AdmissionController {
    window: Duration,
    lists: Mutex<Denylists>,
}

impl AdmissionController {
    /// Creates a controller; a zero window admits everything
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            lists: Mutex::new(Denylists::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    /// Admits a submission or tells the caller how long to wait
    ///
    /// On admission both keys are blocked for the window, replacing any
    /// expired entry.
    ///
    /// # Arguments
    ///
    /// * `identity` - Requester identity, such as the client address
    /// * `uri` - Normalized product URL
    pub fn try_admit(&self, identity: &str, uri: &str) -> Result<(), AdmissionRejected> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(retry_after) = lists.clients.remaining(identity) {
            tracing::debug!("Rejecting {}: client {} throttled", uri, identity);
            return Err(AdmissionRejected::ClientThrottled { retry_after });
        }
        if let Some(retry_after) = lists.products.remaining(uri) {
            tracing::debug!("Rejecting {}: product throttled", uri);
            return Err(AdmissionRejected::ProductThrottled { retry_after });
        }

        lists.clients.purge_expired();
        lists.products.purge_expired();
        lists.clients.arm(identity, self.window);
        lists.products.arm(uri, self.window);
        Ok(())
    }

    /// Number of tracked (client, product) keys
    pub fn tracked(&self) -> (usize, usize) {
        let lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        (lists.clients.len(), lists.products.len())
    }
}
