//! Text renderings of an [`AnalysisRun`]: CSV tables, JSON, and a Markdown
//! document with an executive summary, per-account detail blocks and a
//! summary table. Binary PDF/XLSX/DOCX writers can be layered on top of these.

use crate::error::Result;
use crate::ingestion::RawTable;
use crate::materiality::is_material;
use crate::utils::{format_currency, format_currency_whole, format_percent};
use crate::{AnalysisRun, MaterialVariance};
use csv::Writer;
use std::io::Write;

pub const NO_MATERIAL_VARIANCES: &str =
    "No material variances were found based on the provided thresholds.";

const NOT_REQUESTED: &str = "Not requested";

const MATERIAL_HEADERS: [&str; 9] = [
    "Account Name",
    "Category",
    "Current Period",
    "Prior Period",
    "Dollar Variance",
    "Percent Variance",
    "Variance Type",
    "Is Material",
    "Explanation",
];

/// `"{company}_Variance_Report"`, the stem used for every exported file.
pub fn report_file_stem(company_name: &str) -> String {
    let cleaned: String = company_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}_Variance_Report", cleaned)
}

/// Material variances with every computed column, one row per account.
pub fn write_material_csv<W: Write>(run: &AnalysisRun, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(MATERIAL_HEADERS)?;

    for material in &run.material {
        let r = &material.record;
        wtr.write_record([
            r.account_name.clone(),
            r.category.to_string(),
            r.current_period.to_string(),
            r.prior_period.to_string(),
            r.dollar_variance.to_string(),
            r.percent_variance.to_string(),
            r.variance_type.to_string(),
            material.is_material.to_string(),
            material.explanation.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Every cleaned line item with its variance, flagged against the run's thresholds.
pub fn write_variances_csv<W: Write>(run: &AnalysisRun, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(&MATERIAL_HEADERS[..8])?;

    for r in &run.variances {
        wtr.write_record([
            r.account_name.clone(),
            r.category.to_string(),
            r.current_period.to_string(),
            r.prior_period.to_string(),
            r.dollar_variance.to_string(),
            r.percent_variance.to_string(),
            r.variance_type.to_string(),
            is_material(r, &run.thresholds).to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// The uploaded table exactly as read.
pub fn write_raw_table_csv<W: Write>(table: &RawTable, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn material_csv_string(run: &AnalysisRun) -> Result<String> {
    let mut buf = Vec::new();
    write_material_csv(run, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Pretty JSON. Infinite percent variances serialize as `null` and read back as infinity.
pub fn to_json(run: &AnalysisRun) -> Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

pub fn executive_summary(run: &AnalysisRun) -> String {
    format!(
        "This report details {} material financial variances for {} for the period of {}. \
         Materiality was defined as a variance exceeding {} or {:.1}%.",
        run.material.len(),
        run.company_name,
        run.period_label,
        format_currency_whole(run.thresholds.dollar),
        run.thresholds.percent
    )
}

fn figures_line(material: &MaterialVariance) -> String {
    let r = &material.record;
    format!(
        "Current: {}   |   Prior: {}   |   Change: {} ({})",
        format_currency(r.current_period),
        format_currency(r.prior_period),
        format_currency(r.dollar_variance),
        format_percent(r.percent_variance)
    )
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn render_markdown(run: &AnalysisRun) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {} - Variance Analysis Report\n\n", run.company_name));
    out.push_str(&format!(
        "Period: {} | Generated: {}\n\n",
        run.period_label,
        run.generated_at.format("%Y-%m-%d")
    ));

    out.push_str("## Executive Summary\n\n");
    out.push_str(&executive_summary(run));
    out.push_str("\n\n");

    if run.material.is_empty() {
        out.push_str(NO_MATERIAL_VARIANCES);
        out.push('\n');
        return out;
    }

    out.push_str("## Detailed Analysis\n\n");
    for material in &run.material {
        out.push_str(&format!(
            "### Account: {} ({})\n\n",
            material.record.account_name, material.record.variance_type
        ));
        out.push_str(&figures_line(material));
        out.push_str("\n\n");
        out.push_str(&format!(
            "*Explanation: {}*\n\n",
            material.explanation.as_deref().unwrap_or(NOT_REQUESTED)
        ));
    }

    out.push_str("## Summary Table\n\n");
    out.push_str("| Account | Variance | Figures (Current \\| Prior) | Explanation |\n");
    out.push_str("|---|---|---|---|\n");
    for material in &run.material {
        let r = &material.record;
        out.push_str(&format!(
            "| {} | {} ({}) | {} \\| {} | {} |\n",
            table_cell(&r.account_name),
            format_currency(r.dollar_variance),
            format_percent(r.percent_variance),
            format_currency(r.current_period),
            format_currency(r.prior_period),
            table_cell(material.explanation.as_deref().unwrap_or(NOT_REQUESTED))
        ));
    }

    out
}
