//! # P&L Variance Analyzer
//!
//! Period-over-period variance analysis for profit-and-loss statements.
//!
//! ## Pipeline
//!
//! 1. **Cleaner**: strips `$` and `,` from amounts, drops empty and all-zero rows
//! 2. **Variance Calculator**: dollar and percent change, classified as
//!    Favorable / Unfavorable / Neutral from the account's category
//! 3. **Materiality Filter**: keeps non-Neutral rows whose dollar or percent
//!    change meets a threshold
//! 4. **Explanation Annotator**: asks a language model for a one-sentence cause
//!    per material row; failures become inline placeholders
//!
//! ## Example
//!
//! ```rust,ignore
//! use pnl_variance_analyzer::*;
//!
//! let table = RawTable::from_path("sample_pnl.csv")?;
//! let config = AnalysisConfig::new("ACME Corp").with_thresholds(50_000.0, 10.0);
//!
//! let client = llm::OpenAiClient::from_env()?;
//! let run = run_analysis(&table, &config, client).await?;
//!
//! println!("{}", report::render_markdown(&run));
//! ```

pub mod categorizer;
pub mod cleaner;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod materiality;
pub mod report;
pub mod schema;
pub mod utils;
pub mod variance;

pub use categorizer::categorize_account;
pub use cleaner::{clean_line_items, parse_amount};
pub use error::{Result, VarianceError};
pub use ingestion::*;
pub use llm::{AnnotationEvent, CompletionRequest, ExplanationAnnotator, ExplanationService};
pub use materiality::{flag_material_variances, is_material};
pub use schema::*;
pub use variance::{calculate_variance, calculate_variances, classify_variance};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

/// Output of the synchronous stages (clean, calculate, filter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub period_label: String,
    /// Data rows in the uploaded table, before cleaning.
    pub rows_read: usize,
    pub variances: Vec<VarianceRecord>,
    pub material: Vec<MaterialVariance>,
}

/// Everything one invocation produced. The caller owns retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub company_name: String,
    pub period_label: String,
    pub thresholds: MaterialityThresholds,
    pub generated_at: DateTime<Utc>,
    /// Every cleaned line item with its variance, in input order.
    pub variances: Vec<VarianceRecord>,
    /// Material variances in input order, annotated when explanations were requested.
    pub material: Vec<MaterialVariance>,
}

impl AnalysisRun {
    pub fn from_summary(config: &AnalysisConfig, summary: VarianceSummary) -> Self {
        Self {
            company_name: config.company_name.clone(),
            period_label: summary.period_label,
            thresholds: config.thresholds,
            generated_at: Utc::now(),
            variances: summary.variances,
            material: summary.material,
        }
    }

    pub fn count_by_type(&self, variance_type: VarianceType) -> usize {
        self.material
            .iter()
            .filter(|m| m.record.variance_type == variance_type)
            .count()
    }

    /// Rows whose explanation is an error placeholder.
    pub fn failed_explanations(&self) -> usize {
        self.material
            .iter()
            .filter(|m| {
                m.explanation
                    .as_deref()
                    .is_some_and(|e| e.starts_with(llm::EXPLANATION_ERROR_PREFIX))
            })
            .count()
    }
}

pub struct VarianceAnalyzer;

impl VarianceAnalyzer {
    /// Runs clean, calculate and filter. No external calls.
    pub fn analyze(table: &RawTable, config: &AnalysisConfig) -> Result<VarianceSummary> {
        config.thresholds.validate()?;

        let mapping = table.mapping_or_positional(config.columns.as_ref())?;
        let raw_items = table.extract(&mapping)?;

        info!(
            "Analyzing {} rows for {} ({})",
            raw_items.len(),
            config.company_name,
            mapping.period_label()
        );

        let items = clean_line_items(&raw_items);
        let variances = calculate_variances(&items);
        let material = flag_material_variances(&variances, &config.thresholds);

        debug!(
            "{} line items after cleaning, {} material at ${} / {}%",
            variances.len(),
            material.len(),
            config.thresholds.dollar,
            config.thresholds.percent
        );

        Ok(VarianceSummary {
            period_label: mapping.period_label(),
            rows_read: raw_items.len(),
            variances,
            material,
        })
    }

    /// Full pipeline with explanations. Configuration is validated before any
    /// work starts; explanation failures never fail the run.
    pub async fn run<S: ExplanationService>(
        table: &RawTable,
        config: &AnalysisConfig,
        service: S,
    ) -> Result<AnalysisRun> {
        Self::run_with_progress(table, config, service, None).await
    }

    pub async fn run_with_progress<S: ExplanationService>(
        table: &RawTable,
        config: &AnalysisConfig,
        service: S,
        progress: Option<Sender<AnnotationEvent>>,
    ) -> Result<AnalysisRun> {
        config.validate()?;

        let summary = Self::analyze(table, config)?;
        let mut run = AnalysisRun::from_summary(config, summary);

        if !run.material.is_empty() {
            let annotator = ExplanationAnnotator::new(service, config.explanations.clone());
            let material = std::mem::take(&mut run.material);
            run.material = annotator.annotate(material, progress).await;
        }

        info!(
            "Analysis complete: {} material variances ({} favorable, {} unfavorable), {} explanation failures",
            run.material.len(),
            run.count_by_type(VarianceType::Favorable),
            run.count_by_type(VarianceType::Unfavorable),
            run.failed_explanations()
        );

        Ok(run)
    }

    /// Stages 1-3 only; material rows keep `explanation: None`.
    pub fn run_without_explanations(
        table: &RawTable,
        config: &AnalysisConfig,
    ) -> Result<AnalysisRun> {
        config.validate()?;
        let summary = Self::analyze(table, config)?;
        Ok(AnalysisRun::from_summary(config, summary))
    }
}

pub fn analyze_variances(table: &RawTable, config: &AnalysisConfig) -> Result<VarianceSummary> {
    VarianceAnalyzer::analyze(table, config)
}

pub async fn run_analysis<S: ExplanationService>(
    table: &RawTable,
    config: &AnalysisConfig,
    service: S,
) -> Result<AnalysisRun> {
    VarianceAnalyzer::run(table, config, service).await
}
