use crate::categorizer::categorize_account;
use crate::schema::{AccountCategory, LineItem, VarianceRecord, VarianceType};

/// Percent change relative to the prior period. A zero prior period yields
/// `f64::INFINITY` rather than an error.
pub fn percent_variance(dollar_variance: f64, prior_period: f64) -> f64 {
    if prior_period != 0.0 {
        dollar_variance / prior_period * 100.0
    } else {
        f64::INFINITY
    }
}

pub fn classify_variance(category: AccountCategory, dollar_variance: f64) -> VarianceType {
    match category {
        AccountCategory::Revenue if dollar_variance > 0.0 => VarianceType::Favorable,
        AccountCategory::Revenue if dollar_variance < 0.0 => VarianceType::Unfavorable,
        AccountCategory::Expense if dollar_variance < 0.0 => VarianceType::Favorable,
        AccountCategory::Expense if dollar_variance > 0.0 => VarianceType::Unfavorable,
        _ => VarianceType::Neutral,
    }
}

pub fn calculate_variance(item: &LineItem) -> VarianceRecord {
    let category = categorize_account(&item.account_name);
    let dollar_variance = item.current_period - item.prior_period;

    VarianceRecord {
        account_name: item.account_name.clone(),
        current_period: item.current_period,
        prior_period: item.prior_period,
        category,
        dollar_variance,
        percent_variance: percent_variance(dollar_variance, item.prior_period),
        variance_type: classify_variance(category, dollar_variance),
    }
}

pub fn calculate_variances(items: &[LineItem]) -> Vec<VarianceRecord> {
    items.iter().map(calculate_variance).collect()
}
