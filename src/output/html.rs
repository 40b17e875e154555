//! HTML rendering of crawl results

use crate::crawler::{BranchResult, CrawlResult};
use crate::jobs::CrawlJob;
use chrono::{DateTime, Utc};

/// Shown instead of a table when no branch produced a price
pub const ALL_FAILED_MESSAGE: &str = "Unfortunately too many errors occurred. The shop may be \
blocking us at the moment. Please try again later.";

/// Renders the ranked price table
///
/// A crawl in which every attempted branch failed renders
/// [`ALL_FAILED_MESSAGE`] instead.
pub fn render_result_table(result: &CrawlResult) -> String {
    if result.all_failed() {
        return format!("<p>{}</p>", escape_html(ALL_FAILED_MESSAGE));
    }

    let mut html = String::new();
    html.push_str("<table class=\"table\">\n");
    html.push_str("  <thead>\n");
    html.push_str(
        "    <tr><th>Branch ID</th><th>Branch</th><th>Price</th><th>Link</th></tr>\n",
    );
    html.push_str("  </thead>\n");
    html.push_str("  <tbody>\n");
    for branch in &result.branches {
        html.push_str(&render_row(branch));
    }
    html.push_str("  </tbody>\n");
    html.push_str("</table>\n");
    html
}

fn render_row(branch: &BranchResult) -> String {
    let display_unit = if branch.display_unit {
        " (display unit)"
    } else {
        ""
    };

    format!(
        "    <tr><td>{}</td><td>{}</td><td>{}{}</td>\
<td><a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">To the shop</a></td></tr>\n",
        escape_html(&branch.branch_id),
        escape_html(&branch.branch_name),
        escape_html(&branch.price_label()),
        display_unit,
        escape_html(branch.url.as_str()),
    )
}

/// Renders the body of the result email for a completed job
pub fn render_email_body(job: &CrawlJob, result: &CrawlResult, completed_at: DateTime<Utc>) -> String {
    format!(
        "<h1>Your price request</h1>\n\
<h2>for {}</h2>\n\
<h3>Requested: {}, Completed: {}</h3>\n\
{}",
        escape_html(result.product_name.as_deref().unwrap_or_else(|| job.display_name())),
        format_timestamp(job.created_at),
        format_timestamp(completed_at),
        render_result_table(result),
    )
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Escapes text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
