//! End-to-end training run: load, clean, split, fit, evaluate, persist

use polars::prelude::DataFrame;
use std::path::Path;
use tracing::info;

use crate::config::PipelineConfig;
use crate::dataset::DatasetPreparer;
use crate::error::Result;
use crate::evaluation::{EvaluationReport, MetricsEngine};
use crate::export::{ArtifactMetadata, ArtifactStore, ModelArtifact};
use crate::training::ChurnClassifier;
use crate::utils::Timer;

/// Name recorded in the bundle metadata
pub const MODEL_NAME: &str = "churn_gbdt";

/// Trained bundle and its holdout evaluation
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub report: EvaluationReport,
}

/// Orchestrates one training run
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    preparer: DatasetPreparer,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let preparer = DatasetPreparer::from_config(&config);
        Ok(Self { config, preparer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.config.artifact_dir)
    }

    /// Train from a file and persist the bundle
    pub fn run(&self, path: impl AsRef<Path>) -> Result<TrainingOutcome> {
        let path = path.as_ref();
        info!(path = %path.display(), "Starting training run");
        let df = self.preparer.load(path)?;
        self.run_frame(&df)
    }

    /// Train from an in-memory table and persist the bundle
    pub fn run_frame(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        let outcome = self.fit_frame(df)?;
        self.store().save(&outcome.artifact, Some(&outcome.report))?;
        Ok(outcome)
    }

    /// Train and evaluate without touching the artifact directory
    pub fn fit_frame(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        let mut timer = Timer::start("training run");

        let prepared = self.preparer.prepare_frame(df)?;
        info!(
            rows_loaded = prepared.summary.rows_loaded,
            rows_dropped = prepared.summary.rows_dropped,
            label_source = %prepared.summary.label_source,
            train = prepared.summary.train_size,
            test = prepared.summary.test_size,
            "Prepared dataset"
        );
        timer.checkpoint("prepare");

        let names = prepared.codec.spec().names();
        let mut classifier = ChurnClassifier::new(self.config.boosting.clone());
        classifier.fit(&prepared.x_train, &prepared.y_train, &names)?;
        let training_secs = timer.checkpoint("fit");

        let y_score = classifier.predict_proba(&prepared.x_test)?;
        let y_pred = classifier.predict(&prepared.x_test)?;
        let result = MetricsEngine::new().evaluate(&prepared.y_test, &y_pred, &y_score)?;
        timer.checkpoint("evaluate");

        let ranked = classifier.ranked_importance()?;
        let report = EvaluationReport::new(&result, &ranked, prepared.summary.clone(), training_secs);

        let metadata = ArtifactMetadata::new(MODEL_NAME).with_dataset(&prepared.summary);
        let artifact = ModelArtifact::new(classifier, prepared.codec, metadata)?;

        timer.stop_with_report();
        Ok(TrainingOutcome { artifact, report })
    }
}
