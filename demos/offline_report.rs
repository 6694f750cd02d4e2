use async_trait::async_trait;
use pnl_variance_analyzer::report::{render_markdown, to_json};
use pnl_variance_analyzer::{
    AnalysisConfig, CompletionRequest, ExplanationService, ExplanationSettings, RawTable, Result,
    VarianceAnalyzer,
};

/// Answers from the figures in the prompt instead of calling a model.
struct TemplateExplainer;

#[async_trait]
impl ExplanationService for TemplateExplainer {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let field = |prefix: &str| {
            request
                .prompt
                .lines()
                .find_map(|line| line.strip_prefix(prefix))
                .unwrap_or("?")
                .to_string()
        };

        Ok(format!(
            "{} changed by {} ({}) versus the prior period.",
            field("Account: "),
            field("- Dollar Change: "),
            field("- Percent Change: ")
        ))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let table = RawTable::from_path("demos/data/sample_pnl.csv")?;
    let config = AnalysisConfig::new("Demo Co")
        .with_thresholds(50_000.0, 10.0)
        .with_explanations(ExplanationSettings {
            request_delay_ms: 0,
            ..ExplanationSettings::default()
        });

    let run = VarianceAnalyzer::run(&table, &config, TemplateExplainer).await?;

    println!("{}", render_markdown(&run));
    println!("{}", to_json(&run)?);

    Ok(())
}
