//! Demo: classify a description from argv and print the analysis as JSON.
//!
//! `cargo run --bin classify-demo -- "The bridge on Main Street is cracking"`
//! Set `ANALYSIS_TEST_MODE=mock` to exercise the external path without credentials,
//! and `PRINT_METRICS=1` to dump the Prometheus exposition afterwards.

use civic_report_classifier::{init_tracing, AnalysisRuntime, Metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let metrics = Metrics::init()?;

    let description = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let runtime = AnalysisRuntime::load();

    let analysis = runtime.pipeline.classify_report(&description).await?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);

    if std::env::var("PRINT_METRICS").ok().as_deref() == Some("1") {
        println!("{}", metrics.render());
    }
    Ok(())
}
