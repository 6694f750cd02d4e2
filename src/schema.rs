use crate::error::{Result, VarianceError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_DOLLAR_THRESHOLD: f64 = 50_000.0;
pub const DEFAULT_PERCENT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountCategory {
    #[schemars(description = "Income-side accounts (revenue, sales, income, gains). An increase is favorable.")]
    Revenue,

    #[schemars(description = "Cost-side accounts (COGS, costs, expenses, losses, spending). A decrease is favorable.")]
    Expense,

    #[schemars(description = "Anything else (subtotals such as Gross Profit). Never favorable or unfavorable.")]
    Other,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Revenue => "revenue",
            AccountCategory::Expense => "expense",
            AccountCategory::Other => "other",
        }
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum VarianceType {
    Favorable,
    Unfavorable,
    Neutral,
}

impl VarianceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarianceType::Favorable => "Favorable",
            VarianceType::Unfavorable => "Unfavorable",
            VarianceType::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for VarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned P&L row. At least one of the two periods is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub account_name: String,
    pub current_period: f64,
    pub prior_period: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceRecord {
    pub account_name: String,
    pub current_period: f64,
    pub prior_period: f64,
    pub category: AccountCategory,
    /// `current_period - prior_period`
    pub dollar_variance: f64,
    /// Percent of the prior period. `f64::INFINITY` when the prior period is zero,
    /// written to JSON as `null`.
    #[serde(with = "infinite_as_null")]
    pub percent_variance: f64,
    pub variance_type: VarianceType,
}

mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialVariance {
    #[serde(flatten)]
    pub record: VarianceRecord,
    pub is_material: bool,
    /// Populated by the annotator; `None` until then.
    pub explanation: Option<String>,
}

impl MaterialVariance {
    pub fn new(record: VarianceRecord) -> Self {
        Self {
            record,
            is_material: true,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Names of the three input columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMapping {
    #[schemars(description = "Header of the column holding account names.")]
    pub account: String,
    #[schemars(description = "Header of the current period amounts column.")]
    pub current: String,
    #[schemars(description = "Header of the prior period amounts column.")]
    pub prior: String,
}

impl ColumnMapping {
    pub fn new(
        account: impl Into<String>,
        current: impl Into<String>,
        prior: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            current: current.into(),
            prior: prior.into(),
        }
    }

    /// First column is the account, second the current period, third the prior period.
    pub fn positional(headers: &[String]) -> Result<Self> {
        if headers.len() < 3 {
            return Err(VarianceError::TooFewColumns(headers.len()));
        }
        Ok(Self::new(
            headers[0].clone(),
            headers[1].clone(),
            headers[2].clone(),
        ))
    }

    pub fn period_label(&self) -> String {
        format!("{} vs. {}", self.current, self.prior)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MaterialityThresholds {
    #[schemars(description = "Absolute dollar change at or above which a variance is material.")]
    pub dollar: f64,
    #[schemars(description = "Absolute percent change (e.g. 10.0 for 10%) at or above which a variance is material.")]
    pub percent: f64,
}

impl MaterialityThresholds {
    pub fn new(dollar: f64, percent: f64) -> Self {
        Self { dollar, percent }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.dollar.is_finite() || self.dollar < 0.0 {
            return Err(VarianceError::InvalidThreshold {
                name: "dollar",
                value: self.dollar,
            });
        }
        if !self.percent.is_finite() || self.percent < 0.0 {
            return Err(VarianceError::InvalidThreshold {
                name: "percent",
                value: self.percent,
            });
        }
        Ok(())
    }
}

impl Default for MaterialityThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_DOLLAR_THRESHOLD, DEFAULT_PERCENT_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExplanationSettings {
    #[schemars(description = "Model identifier sent with every completion request.")]
    pub model: String,
    #[schemars(description = "Maximum output tokens per explanation.")]
    pub max_tokens: u32,
    #[schemars(description = "Sampling temperature, between 0.0 and 2.0.")]
    pub temperature: f32,
    #[schemars(description = "Minimum delay between the starts of consecutive requests, in milliseconds.")]
    pub request_delay_ms: u64,
    #[schemars(description = "Per-request timeout in seconds.")]
    pub request_timeout_secs: u64,
    #[schemars(description = "How many requests may be in flight at once. 1 means strictly sequential.")]
    pub max_concurrency: usize,
}

impl ExplanationSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(VarianceError::InvalidConfig(
                "explanation model must not be empty".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(VarianceError::InvalidConfig(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(VarianceError::InvalidConfig(format!(
                "temperature {} must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(VarianceError::InvalidConfig(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(VarianceError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExplanationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 100,
            temperature: 0.4,
            request_delay_ms: 1_000,
            request_timeout_secs: 30,
            max_concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisConfig {
    #[schemars(description = "Company name printed on reports.")]
    pub company_name: String,

    #[schemars(
        description = "Column roles. When omitted the first three columns are used as account, current and prior."
    )]
    #[serde(default)]
    pub columns: Option<ColumnMapping>,

    #[serde(default)]
    pub thresholds: MaterialityThresholds,

    #[serde(default)]
    pub explanations: ExplanationSettings,
}

impl AnalysisConfig {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_thresholds(mut self, dollar: f64, percent: f64) -> Self {
        self.thresholds = MaterialityThresholds::new(dollar, percent);
        self
    }

    pub fn with_explanations(mut self, explanations: ExplanationSettings) -> Self {
        self.explanations = explanations;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(AnalysisConfig);
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.explanations.validate()?;
        if let Some(columns) = &self.columns {
            if columns.current == columns.prior {
                return Err(VarianceError::InvalidConfig(format!(
                    "current and prior period columns are both '{}'",
                    columns.current
                )));
            }
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            company_name: "My Company".to_string(),
            columns: None,
            thresholds: MaterialityThresholds::default(),
            explanations: ExplanationSettings::default(),
        }
    }
}
