//! Kolosal Churn - customer churn prediction engine
//!
//! This crate trains, evaluates and serves a gradient boosted tree model
//! that predicts whether a customer will leave:
//! - Loading and cleaning of the customer table, stratified holdout split
//! - Categorical encoding and standard scaling fitted on training rows only
//! - Gradient boosted decision trees on the logistic loss
//! - Holdout metrics, ROC-AUC and an interpreted evaluation report
//! - A checksummed model bundle replaced atomically on disk
//! - Single-record and batch prediction with risk tiers
//!
//! # Modules
//!
//! - [`dataset`] - Schema, loading, label derivation and splitting
//! - [`preprocessing`] - Feature codec (encoders and scaler)
//! - [`training`] - Regression trees, boosting and the churn classifier
//! - [`evaluation`] - Metrics engine, interpretation and report
//! - [`export`] - Artifact bundle and store
//! - [`inference`] - Predictor
//! - [`pipeline`] - End-to-end training run
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Core ML modules
pub mod dataset;
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod inference;

// Orchestration
pub mod pipeline;

// Utilities
pub mod export;
pub mod utils;

// Services
pub mod cli;

pub use error::{ChurnError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChurnError, Result};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Data
    pub use crate::dataset::{DatasetPreparer, FeatureSpec, FieldValue, PreparedDataset, Record};

    // Preprocessing
    pub use crate::preprocessing::{CodecState, FeatureCodec};

    // Training
    pub use crate::training::{ChurnClassifier, GradientBoostingConfig};

    // Evaluation
    pub use crate::evaluation::{ConfusionMatrix, EvaluationReport, EvaluationResult, MetricsEngine};

    // Persistence and inference
    pub use crate::export::{ArtifactStore, ModelArtifact};
    pub use crate::inference::{PredictionResult, Predictor, RiskTier};

    // Pipeline
    pub use crate::pipeline::{TrainingOutcome, TrainingPipeline};
}
