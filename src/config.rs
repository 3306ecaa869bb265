//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChurnError, Result};
use crate::training::GradientBoostingConfig;

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of usable rows withheld for evaluation
    pub test_fraction: f64,

    /// Seed for the split; the ensemble has its own seed in `boosting`
    pub random_state: u64,

    /// Minimum usable rows after cleaning
    pub min_rows: usize,

    /// Directory holding the artifact bundle
    pub artifact_dir: PathBuf,

    /// Field delimiter of the input table; `None` picks by file extension
    pub delimiter: Option<char>,

    /// Ensemble hyperparameters
    pub boosting: GradientBoostingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            random_state: 42,
            min_rows: 10,
            artifact_dir: PathBuf::from("ml_models"),
            delimiter: None,
            boosting: GradientBoostingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the holdout fraction
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Builder method to set the split seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the minimum usable row count
    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    /// Builder method to set the artifact directory
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Builder method to set the input delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Builder method to set ensemble hyperparameters
    pub fn with_boosting(mut self, boosting: GradientBoostingConfig) -> Self {
        self.boosting = boosting;
        self
    }

    /// Check every field, reporting the first invalid one
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ChurnError::invalid_parameter(
                "test_fraction",
                self.test_fraction,
                "must be strictly between 0 and 1",
            ));
        }
        if self.min_rows < 2 {
            return Err(ChurnError::invalid_parameter("min_rows", self.min_rows, "must be at least 2"));
        }
        if self.artifact_dir.as_os_str().is_empty() {
            return Err(ChurnError::invalid_parameter("artifact_dir", "\"\"", "must not be empty"));
        }
        if let Some(d) = self.delimiter {
            if !d.is_ascii() || matches!(d, '"' | '\n' | '\r') {
                return Err(ChurnError::invalid_parameter(
                    "delimiter",
                    format!("{:?}", d),
                    "must be a single ASCII character other than a quote or line break",
                ));
            }
        }
        self.boosting.validate()
    }

    /// Read a JSON configuration; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            ChurnError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }
}
