//! Plain-text rendering for the terminal

use crate::crawler::CrawlResult;
use crate::output::ALL_FAILED_MESSAGE;

/// Renders the ranked price list as an aligned text table
pub fn render_text_table(result: &CrawlResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        result.product_name.as_deref().unwrap_or(result.product_url.as_str())
    ));

    if result.all_failed() {
        out.push_str(ALL_FAILED_MESSAGE);
        out.push('\n');
        return out;
    }

    let id_width = column_width("Branch ID", result.branches.iter().map(|b| b.branch_id.len()));
    let name_width = column_width("Branch", result.branches.iter().map(|b| b.branch_name.chars().count()));
    let price_width = column_width("Price", result.branches.iter().map(|b| b.price_label().chars().count()));

    out.push_str(&format!(
        "{:<id_width$}  {:<name_width$}  {:>price_width$}  Link\n",
        "Branch ID", "Branch", "Price"
    ));
    for branch in &result.branches {
        let marker = if branch.display_unit { " *" } else { "" };
        out.push_str(&format!(
            "{:<id_width$}  {:<name_width$}  {:>price_width$}  {}{}\n",
            branch.branch_id,
            branch.branch_name,
            branch.price_label(),
            branch.url,
            marker,
        ));
    }

    if result.branches.iter().any(|b| b.display_unit) {
        out.push_str("* display unit\n");
    }
    if result.skipped_count() > 0 {
        out.push_str(&format!(
            "{} branches skipped after too many errors\n",
            result.skipped_count()
        ));
    }
    out
}

fn column_width(header: &str, values: impl Iterator<Item = usize>) -> usize {
    values.fold(header.len(), usize::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{BranchPrice, BranchResult, Price};
    use crate::url::normalize_product_url;

    #[test]
    fn test_text_table() {
        let product =
            normalize_product_url("https://www.shop.example/p/1", "https://www.shop.example")
                .unwrap();
        let branches = vec![BranchResult {
            branch_id: "e_1".to_string(),
            branch_name: "Center".to_string(),
            price: BranchPrice::Priced(Price::from_cents(1999)),
            url: product.branch_url("branch_id", "e_1"),
            display_unit: true,
        }];
        let result = CrawlResult::new(product, branches, None, None, 0, 3);

        let text = render_text_table(&result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "https://www.shop.example/p/1");
        assert!(lines[1].starts_with("Branch ID"));
        assert!(lines[2].contains("19.99€"));
        assert!(lines[2].ends_with(" *"));
        assert!(text.contains("2 branches skipped"));
    }
}
