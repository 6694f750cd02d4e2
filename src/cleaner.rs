use crate::ingestion::RawLineItem;
use crate::schema::LineItem;
use log::debug;

/// Parses a P&L amount cell. `$` and `,` are stripped before parsing;
/// anything that still isn't a finite number is treated as missing.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let stripped: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalizes raw rows into line items, preserving row order.
///
/// - rows with both amounts missing are dropped
/// - a single missing amount becomes 0
/// - rows where both amounts are 0 after filling are dropped
pub fn clean_line_items(raw: &[RawLineItem]) -> Vec<LineItem> {
    let items: Vec<LineItem> = raw
        .iter()
        .filter_map(|row| {
            let current = parse_amount(&row.current);
            let prior = parse_amount(&row.prior);

            if current.is_none() && prior.is_none() {
                return None;
            }

            let current_period = current.unwrap_or(0.0);
            let prior_period = prior.unwrap_or(0.0);

            if current_period == 0.0 && prior_period == 0.0 {
                return None;
            }

            Some(LineItem {
                account_name: row.account_name.clone(),
                current_period,
                prior_period,
            })
        })
        .collect();

    debug!(
        "Cleaning kept {} of {} rows",
        items.len(),
        raw.len()
    );

    items
}
