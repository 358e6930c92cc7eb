use anyhow::{Context, Result};
use clap::Parser;
use news_digest::{AlwaysRun, PipelineBuilder, RunConfig, RunOutcome};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "news-digest")]
#[command(about = "Collect, filter and select recent news items for a digest")]
struct Args {
    /// Run configuration (TOML). Defaults apply when the file is missing.
    #[arg(short, long, default_value = "news-digest.toml")]
    config: PathBuf,

    /// Ignore the run interval gate
    #[arg(long)]
    force: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the selected items as JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    if dotenvy::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let config = RunConfig::load(Some(&args.config))
        .await
        .context("Failed to load run configuration")?;

    let mut builder = PipelineBuilder::new(config)?
        .with_catalog_sources()
        .with_google_news_search()
        .with_environment_collaborators()?;
    if args.force {
        builder = builder.with_gate(Box::new(AlwaysRun));
    }

    let report = builder.build().run().await;
    for stage in &report.stages {
        info!(
            "{:?}: {} items, {} failures",
            stage.stage,
            stage.items,
            stage.failures.len()
        );
    }

    match &report.outcome {
        RunOutcome::Done { selected } => {
            let json = serde_json::to_string_pretty(selected)?;
            match &args.output {
                Some(path) => {
                    tokio::fs::write(path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} items to {}", selected.len(), path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        RunOutcome::Skipped { reason } => {
            info!("Run skipped: {}", reason);
            Ok(())
        }
        RunOutcome::Failed { reason } => {
            error!("Run {} failed: {}", report.run_id, reason);
            anyhow::bail!("run failed: {}", reason)
        }
    }
}
