//! Churn CLI module
//!
//! Thin command-line front end over the training pipeline and predictor.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::dataset::Record;
use crate::error::Result;
use crate::export::ArtifactStore;
use crate::inference::{PredictionResult, Predictor};
use crate::pipeline::TrainingPipeline;

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    eprintln!("  {} {}", ok("✓"), msg);
}

fn kv(key: &str, val: &str) {
    eprintln!("    {} {}", dim(key), val);
}

#[derive(Parser)]
#[command(name = "kolosal-churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn training and prediction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a churn model from a CSV file and save the bundle
    Train {
        /// Input customer table (CSV or TSV)
        #[arg(short, long)]
        data: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Artifact directory (overrides the configuration)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Field delimiter (overrides the configuration; default by extension)
        #[arg(long)]
        delimiter: Option<char>,
    },

    /// Predict churn for customer records
    Predict {
        /// Artifact directory
        #[arg(short, long, default_value = "ml_models")]
        artifacts: PathBuf,

        /// JSON file holding one record object or an array of records
        #[arg(short, long)]
        record: PathBuf,
    },

    /// Print the evaluation report saved with a bundle
    Report {
        /// Artifact directory
        #[arg(short, long, default_value = "ml_models")]
        artifacts: PathBuf,
    },
}

/// Execute train command
pub fn cmd_train(
    data: &Path,
    config: Option<&Path>,
    artifacts: Option<&Path>,
    delimiter: Option<char>,
) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = artifacts {
        config = config.with_artifact_dir(dir);
    }
    if let Some(d) = delimiter {
        config = config.with_delimiter(d);
    }

    let pipeline = TrainingPipeline::new(config)?;
    let outcome = pipeline.run(data)?;

    let m = &outcome.report.metrics;
    step_ok(&format!("Model saved to {}", pipeline.config().artifact_dir.display()));
    kv("accuracy ", &format!("{:.4}", m.accuracy));
    kv("precision", &format!("{:.4}", m.precision));
    kv("recall   ", &format!("{:.4}", m.recall));
    kv("f1       ", &format!("{:.4}", m.f1_score));
    kv(
        "roc_auc  ",
        &m.roc_auc.map_or_else(|| "undefined".to_string(), |v| format!("{:.4}", v)),
    );
    kv("overall  ", outcome.report.interpretation.overall_description.as_str());

    println!("{}", outcome.report.to_json()?);
    Ok(())
}

/// Execute predict command
pub fn cmd_predict(artifacts: &Path, record: &Path) -> anyhow::Result<()> {
    let predictor = Predictor::load(&ArtifactStore::new(artifacts))?;

    let text = std::fs::read_to_string(record)
        .with_context(|| format!("cannot read {}", record.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", record.display()))?;

    let output = if value.is_array() {
        let records: Vec<Record> = serde_json::from_value(value)?;
        batch_json(predictor.predict_batch(&records))?
    } else {
        let record: Record = serde_json::from_value(value)?;
        serde_json::to_value(predictor.predict_one(&record)?)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One JSON entry per record, failures as `{"error": ...}`
fn batch_json(results: Vec<Result<PredictionResult>>) -> serde_json::Result<serde_json::Value> {
    let entries = results
        .into_iter()
        .map(|r| match r {
            Ok(p) => serde_json::to_value(p),
            Err(e) => Ok(serde_json::json!({ "error": e.to_string() })),
        })
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(serde_json::Value::Array(entries))
}

/// Execute report command
pub fn cmd_report(artifacts: &Path) -> anyhow::Result<()> {
    let report = ArtifactStore::new(artifacts)
        .load_report()?
        .with_context(|| format!("no evaluation report stored in {}", artifacts.display()))?;
    println!("{}", report.to_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train() {
        let cli = Cli::parse_from(["kolosal-churn", "train", "--data", "clientes.csv", "-a", "out"]);
        match cli.command {
            Commands::Train { data, config, artifacts, delimiter } => {
                assert_eq!(data, PathBuf::from("clientes.csv"));
                assert!(config.is_none());
                assert_eq!(artifacts, Some(PathBuf::from("out")));
                assert!(delimiter.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_parse_train_delimiter() {
        let cli = Cli::parse_from(["kolosal-churn", "train", "-d", "clientes.txt", "--delimiter", ";"]);
        match cli.command {
            Commands::Train { delimiter, .. } => assert_eq!(delimiter, Some(';')),
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_batch_json_keeps_order_and_errors() {
        let results = vec![
            Ok(PredictionResult::from_probability(0.8)),
            Err(ChurnError::UnseenCategory { feature: "sexo".into(), value: "X".into() }),
        ];
        let json = batch_json(results).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["predicted_label"], 1);
        assert!(entries[1]["error"].as_str().unwrap().contains("sexo"));
    }
}
