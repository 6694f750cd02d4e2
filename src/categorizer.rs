use crate::schema::AccountCategory;

pub const REVENUE_KEYWORDS: &[&str] = &["revenue", "sales", "income", "gain"];
pub const EXPENSE_KEYWORDS: &[&str] = &["cogs", "cost", "expense", "loss", "spending"];

/// Infers the account category from its name. Revenue keywords are checked
/// before expense keywords, so "Sales & Marketing" lands in revenue.
pub fn categorize_account(account_name: &str) -> AccountCategory {
    let lower = account_name.to_lowercase();

    if REVENUE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        AccountCategory::Revenue
    } else if EXPENSE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        AccountCategory::Expense
    } else {
        AccountCategory::Other
    }
}
