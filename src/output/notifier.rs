//! Result delivery

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while delivering a notification
#[derive(Debug, Error)]
pub enum SendError {
    #[error("No recipients")]
    NoRecipients,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers a rendered result to the job's contacts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, addresses: &[String], subject: &str, body: &str)
        -> Result<(), SendError>;
}

/// Writes notifications to the log instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        addresses: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), SendError> {
        if addresses.is_empty() {
            return Err(SendError::NoRecipients);
        }
        tracing::info!(
            "Notification to {}: {} ({} bytes)",
            addresses.join(", "),
            subject,
            body.len()
        );
        tracing::debug!("Notification body:\n{}", body);
        Ok(())
    }
}
