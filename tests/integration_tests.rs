use async_trait::async_trait;
use pnl_variance_analyzer::llm::EXPLANATION_ERROR_PREFIX;
use pnl_variance_analyzer::report::{render_markdown, to_json, write_material_csv};
use pnl_variance_analyzer::*;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

const MESSY_PNL: &str = "Account,FY2024,FY2023,Notes\n\
    Revenue,\"$1,250,000\",\"$1,100,000\",core\n\
    Cost of Goods Sold,\"$470,000\",\"$420,000\",\n\
    Gross Profit,\"$780,000\",\"$680,000\",subtotal\n\
    ,,,\n\
    R&D Expenses,\" 210,000 \",\"240,000\",\n\
    Dormant Fees,0,0,\n\
    Licensing Income,\"$12,000\",,new line\n\
    Legal Expense,n/a,\"$8,000\",\n\
    Interest Expense,16000,14000\n";

struct CannedService {
    calls: AtomicUsize,
}

impl CannedService {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ExplanationService for CannedService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.prompt.contains("Account: Legal Expense") {
            return Err(VarianceError::ExplanationFailed(
                "401 Unauthorized".to_string(),
            ));
        }
        Ok("Change driven by underlying business activity.".to_string())
    }
}

fn table() -> RawTable {
    RawTable::from_reader(MESSY_PNL.as_bytes(), b',').unwrap()
}

fn config() -> AnalysisConfig {
    AnalysisConfig::new("Test Company")
        .with_columns(ColumnMapping::new("Account", "FY2024", "FY2023"))
        .with_thresholds(50_000.0, 10.0)
        .with_explanations(ExplanationSettings {
            request_delay_ms: 0,
            ..ExplanationSettings::default()
        })
}

fn record<'a>(records: &'a [VarianceRecord], name: &str) -> &'a VarianceRecord {
    records
        .iter()
        .find(|r| r.account_name == name)
        .unwrap_or_else(|| panic!("no record for {}", name))
}

#[test]
fn test_cleaning_of_messy_upload() {
    let summary = analyze_variances(&table(), &config()).unwrap();

    assert_eq!(summary.rows_read, 9);
    let names: Vec<_> = summary
        .variances
        .iter()
        .map(|r| r.account_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Revenue",
            "Cost of Goods Sold",
            "Gross Profit",
            "R&D Expenses",
            "Licensing Income",
            "Legal Expense",
            "Interest Expense",
        ]
    );

    let licensing = record(&summary.variances, "Licensing Income");
    assert_eq!(licensing.prior_period, 0.0);
    assert_eq!(licensing.percent_variance, f64::INFINITY);

    let legal = record(&summary.variances, "Legal Expense");
    assert_eq!(legal.current_period, 0.0);
    assert_eq!(legal.dollar_variance, -8_000.0);
    assert_eq!(legal.percent_variance, -100.0);
    assert_eq!(legal.variance_type, VarianceType::Favorable);
}

#[test]
fn test_worked_examples() {
    let summary = analyze_variances(&table(), &config()).unwrap();

    let revenue = record(&summary.variances, "Revenue");
    assert_eq!(revenue.dollar_variance, 150_000.0);
    assert!((revenue.percent_variance - 13.64).abs() < 0.01);
    assert_eq!(revenue.category, AccountCategory::Revenue);
    assert_eq!(revenue.variance_type, VarianceType::Favorable);

    let rnd = record(&summary.variances, "R&D Expenses");
    assert_eq!(rnd.dollar_variance, -30_000.0);
    assert_eq!(rnd.category, AccountCategory::Expense);
    assert_eq!(rnd.variance_type, VarianceType::Favorable);
}

#[test]
fn test_material_set_for_messy_upload() {
    let summary = analyze_variances(&table(), &config()).unwrap();
    let names: Vec<_> = summary
        .material
        .iter()
        .map(|m| m.record.account_name.as_str())
        .collect();

    // Gross Profit is Neutral; every other row clears one threshold
    assert_eq!(
        names,
        vec![
            "Revenue",
            "Cost of Goods Sold",
            "R&D Expenses",
            "Licensing Income",
            "Legal Expense",
            "Interest Expense",
        ]
    );
}

#[test]
fn test_missing_column_is_a_single_structural_error() {
    let config = config().with_columns(ColumnMapping::new("Account", "FY2025", "FY2023"));
    let err = analyze_variances(&table(), &config).unwrap_err();
    assert!(err.to_string().contains("FY2025"));
    assert!(err.to_string().contains("FY2024"));
}

#[test]
fn test_rerun_is_deterministic() {
    let first = analyze_variances(&table(), &config()).unwrap();
    let second = analyze_variances(&table(), &config()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rerun_with_stub_service_is_deterministic() {
    let first = run_analysis(&table(), &config(), CannedService::new())
        .await
        .unwrap();
    let second = run_analysis(&table(), &config(), CannedService::new())
        .await
        .unwrap();

    assert_eq!(first.variances, second.variances);
    assert_eq!(first.material, second.material);
}

#[tokio::test]
async fn test_end_to_end_with_partial_failures() {
    let service = CannedService::new();
    let run = VarianceAnalyzer::run(&table(), &config(), &service)
        .await
        .unwrap();

    assert_eq!(service.calls.load(Ordering::SeqCst), 6);
    assert_eq!(run.material.len(), 6);
    assert_eq!(run.failed_explanations(), 1);

    let legal = run
        .material
        .iter()
        .find(|m| m.record.account_name == "Legal Expense")
        .unwrap();
    let text = legal.explanation.as_deref().unwrap();
    assert!(text.starts_with(EXPLANATION_ERROR_PREFIX));
    assert!(text.contains("401 Unauthorized"));

    let doc = render_markdown(&run);
    assert!(doc.contains("This report details 6 material financial variances for Test Company"));
    assert!(doc.contains("### Account: Licensing Income (Favorable)"));

    let mut csv_out = Vec::new();
    write_material_csv(&run, &mut csv_out).unwrap();
    assert_eq!(String::from_utf8(csv_out).unwrap().lines().count(), 7);

    let json: serde_json::Value = serde_json::from_str(&to_json(&run).unwrap()).unwrap();
    assert_eq!(json["material"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_nothing_material_makes_no_requests() {
    let service = CannedService::new();
    let config = config().with_thresholds(1e12, 1e12);

    // no zero-prior rows: those would stay material through the infinite percent
    let table = RawTable::from_reader(
        "Account,FY2024,FY2023\nRevenue,100,99\nGross Profit,50,10\n".as_bytes(),
        b',',
    )
    .unwrap();

    let run = VarianceAnalyzer::run(&table, &config, &service).await.unwrap();
    assert!(run.material.is_empty());
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    assert!(render_markdown(&run).contains(report::NO_MATERIAL_VARIANCES));
}

#[test]
fn test_config_and_table_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let config_path = dir.path().join("analysis.json");
    std::fs::write(
        &config_path,
        r#"{
            "company_name": "File Co",
            "columns": { "account": "Account", "current": "FY2024", "prior": "FY2023" },
            "thresholds": { "dollar": 100000.0, "percent": 50.0 },
            "explanations": { "model": "gpt-4o", "max_concurrency": 2 }
        }"#,
    )
    .unwrap();

    let table_path = dir.path().join("pnl.csv");
    let mut file = std::fs::File::create(&table_path).unwrap();
    file.write_all(MESSY_PNL.as_bytes()).unwrap();

    let config = AnalysisConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.explanations.model, "gpt-4o");
    assert_eq!(config.explanations.max_concurrency, 2);
    assert_eq!(config.explanations.max_tokens, 100);

    let run = VarianceAnalyzer::run_without_explanations(
        &RawTable::from_path(&table_path).unwrap(),
        &config,
    )
    .unwrap();

    let names: Vec<_> = run
        .material
        .iter()
        .map(|m| m.record.account_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Revenue", "Licensing Income", "Legal Expense"]
    );
}

#[test]
fn test_workbook_upload_runs_through_pipeline() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_pnl.xlsx");
    let table = RawTable::from_path(&path).unwrap();

    let run = VarianceAnalyzer::run_without_explanations(&table, &config()).unwrap();
    assert_eq!(run.period_label, "FY2024 vs. FY2023");
    assert_eq!(run.variances.len(), 6);

    let cogs = record(&run.variances, "Cost of Goods Sold");
    assert_eq!(cogs.dollar_variance, 50_000.0);
    assert_eq!(cogs.variance_type, VarianceType::Unfavorable);

    let names: Vec<_> = run
        .material
        .iter()
        .map(|m| m.record.account_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Revenue",
            "Cost of Goods Sold",
            "R&D Expenses",
            "Licensing Income",
            "Interest Expense",
        ]
    );
}
