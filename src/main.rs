//! Kolosal Churn - Main Entry Point

use clap::Parser;
use kolosal_churn::cli::{cmd_predict, cmd_report, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_churn=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, config, artifacts, delimiter } => {
            cmd_train(&data, config.as_deref(), artifacts.as_deref(), delimiter)?;
        }
        Commands::Predict { artifacts, record } => {
            cmd_predict(&artifacts, &record)?;
        }
        Commands::Report { artifacts } => {
            cmd_report(&artifacts)?;
        }
    }

    Ok(())
}
