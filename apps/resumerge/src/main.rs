mod cli;
mod config;
mod errors;
mod extract;
mod llm_client;
mod merge;
mod output;
mod pipeline;
mod structuring;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::llm_client::LlmClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment and .env first, then flag overrides
    let mut config = Config::from_env()?;
    cli.apply(&mut config)?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resumerge v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Extract { .. } => {
            let llm = LlmClient::from_config(&config)?;
            info!("LLM client initialized: {}", llm.describe());

            let summary = pipeline::run_extract(&config, &llm).await?;
            info!(
                "{} record(s) in {}",
                summary.written.len(),
                config.output_dir.display()
            );
            for (path, reason) in &summary.failed {
                info!("Not extracted: {} ({reason})", path.display());
            }
            if let Some(outcome) = &summary.merge {
                info!(
                    "Master resume: {} skills, {} work entries",
                    outcome.master.skills.len(),
                    outcome.master.work_history.len()
                );
            }
        }
        Commands::Merge { .. } => {
            pipeline::run_merge(
                &config.output_dir,
                &config.master_output_path,
                &config.merge_options(),
            )?;
        }
    }

    Ok(())
}
