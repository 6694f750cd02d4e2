use dotenv::dotenv;
use pnl_variance_analyzer::llm::{AnnotationEvent, OpenAiClient};
use pnl_variance_analyzer::report::{
    render_markdown, report_file_stem, write_material_csv, write_variances_csv,
};
use pnl_variance_analyzer::{AnalysisConfig, RawTable, VarianceAnalyzer};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Usage: cargo run --example analyze_pnl --features openai -- [pnl.csv | pnl.xlsx] [config.json]
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let mut args = std::env::args().skip(1);
    let table_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/data/sample_pnl.csv"));
    let config = match args.next() {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::new("My Company"),
    };

    // Fails here, before any analysis, if OPENAI_API_KEY is missing
    let client = OpenAiClient::from_env()?
        .with_timeout(config.explanations.request_timeout())?;

    println!("📄 Reading {:?}", table_path);
    let table = RawTable::from_path(&table_path)?;
    println!(
        "   {} columns, {} rows: {}\n",
        table.headers.len(),
        table.rows.len(),
        table.headers.join(" | ")
    );

    let (tx, mut rx) = mpsc::channel(32);

    let printer = async move {
        while let Some(event) = rx.recv().await {
            match event {
                AnnotationEvent::Starting { total } => {
                    println!("🤖 Requesting {} explanations...", total)
                }
                AnnotationEvent::Requesting { index, account } => {
                    println!("   [{}] {}", index + 1, account)
                }
                AnnotationEvent::Explained { .. } => {}
                AnnotationEvent::Failed { account, reason, .. } => {
                    println!("   ⚠️  {}: {}", account, reason)
                }
                AnnotationEvent::Finished { explained, failed } => {
                    println!("✅ {} explained, {} failed\n", explained, failed)
                }
            }
        }
    };

    let (run, _) = tokio::join!(
        VarianceAnalyzer::run_with_progress(&table, &config, client, Some(tx)),
        printer
    );
    let run = run?;

    let stem = report_file_stem(&run.company_name);
    std::fs::write(format!("{}.md", stem), render_markdown(&run))?;
    write_material_csv(&run, File::create(format!("{}.csv", stem))?)?;
    write_variances_csv(&run, File::create(format!("{}_All.csv", stem))?)?;

    println!("{}", render_markdown(&run));
    println!("💾 Saved {}.md, {}.csv and {}_All.csv", stem, stem, stem);

    Ok(())
}
