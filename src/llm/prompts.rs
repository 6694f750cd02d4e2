// Prompt text for variance explanations

use crate::schema::{AccountCategory, VarianceRecord, VarianceType};
use crate::utils::{format_currency, format_percent};

pub const ANALYST_ROLE: &str =
    "You are a senior financial analyst providing a concise, audit-ready explanation for a P&L variance.";

pub const REVENUE_HINT: &str =
    "Focus on drivers like sales volume, pricing changes, new customer acquisition, or market expansion.";

pub const EXPENSE_HINT: &str =
    "Focus on drivers like increased operational activity, supplier cost changes, new hires, or strategic investments.";

pub const GENERAL_HINT: &str = "Consider general business operations and strategic decisions.";

pub const EXAMPLE_EXPLANATION: &str = r#"Example: "Revenue increased by $150,000 (14.3%) primarily due to a successful new marketing campaign that drove a 20% increase in customer acquisition.""#;

pub fn category_hint(category: AccountCategory) -> &'static str {
    match category {
        AccountCategory::Revenue => REVENUE_HINT,
        AccountCategory::Expense => EXPENSE_HINT,
        AccountCategory::Other => GENERAL_HINT,
    }
}

fn direction_text(variance_type: VarianceType) -> String {
    match variance_type {
        VarianceType::Favorable => "a favorable variance".to_string(),
        VarianceType::Unfavorable => "an unfavorable variance".to_string(),
        VarianceType::Neutral => "a change".to_string(),
    }
}

pub fn build_explanation_prompt(record: &VarianceRecord) -> String {
    format!(
        "{role}\n\n\
         Account: {account}\n\
         Analysis: This account shows {direction}.\n\
         - Current Period: {current}\n\
         - Prior Period: {prior}\n\
         - Dollar Change: {dollar}\n\
         - Percent Change: {percent}\n\n\
         Task: Write a professional, one-sentence explanation for the cause of this variance.\n\
         - Be specific and use business-oriented language.\n\
         - {hint}\n\n\
         {example}\n\n\
         Explanation:",
        role = ANALYST_ROLE,
        account = record.account_name,
        direction = direction_text(record.variance_type),
        current = format_currency(record.current_period),
        prior = format_currency(record.prior_period),
        dollar = format_currency(record.dollar_variance),
        percent = format_percent(record.percent_variance),
        hint = category_hint(record.category),
        example = EXAMPLE_EXPLANATION,
    )
}
