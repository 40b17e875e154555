//! Output module for presenting crawl results
//!
//! This module handles:
//! - Rendering the ranked price table as HTML and plain text
//! - Composing the result email for a completed job
//! - Delivering results through a `Notifier`

mod html;
mod notifier;
mod text;

pub use html::{escape_html, render_email_body, render_result_table, ALL_FAILED_MESSAGE};
pub use notifier::{LogNotifier, Notifier, SendError};
pub use text::render_text_table;

/// Subject line of result notifications
pub fn notification_subject(product: &str) -> String {
    format!("Price-Sweep: branch prices for {}", product)
}
