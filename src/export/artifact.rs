//! The deployable model bundle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::{DatasetSummary, FeatureSpec};
use crate::error::{ChurnError, Result};
use crate::preprocessing::CodecState;
use crate::training::ChurnClassifier;

/// Bundle layout version understood by this build
pub const FORMAT_VERSION: u32 = 1;

/// Descriptive metadata stored in the bundle manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Model name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Column the label was derived from
    pub label_source: String,
    pub label_inverted: bool,
    pub train_size: usize,
    pub test_size: usize,
    pub n_estimators: usize,
    pub feature_names: Vec<String>,
}

impl ArtifactMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            label_source: String::new(),
            label_inverted: false,
            train_size: 0,
            test_size: 0,
            n_estimators: 0,
            feature_names: Vec::new(),
        }
    }

    /// Set label source and sizes from a dataset summary
    pub fn with_dataset(mut self, summary: &DatasetSummary) -> Self {
        self.label_source = summary.label_source.clone();
        self.label_inverted = summary.label_inverted;
        self.train_size = summary.train_size;
        self.test_size = summary.test_size;
        self
    }
}

/// Classifier, codec and feature spec; always handled as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    classifier: ChurnClassifier,
    codec: CodecState,
    metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Bind the parts, filling feature names and tree count into the metadata.
    ///
    /// Fails unless the classifier was fitted on exactly the codec's features.
    pub fn new(classifier: ChurnClassifier, codec: CodecState, mut metadata: ArtifactMetadata) -> Result<Self> {
        check_consistent(&classifier, codec.spec())?;
        metadata.feature_names = codec.spec().names();
        metadata.n_estimators = classifier.n_trees();
        Ok(Self { classifier, codec, metadata })
    }

    /// Reassemble persisted parts; any disagreement is corruption
    pub(crate) fn from_parts(
        classifier: ChurnClassifier,
        codec: CodecState,
        metadata: ArtifactMetadata,
    ) -> Result<Self> {
        check_consistent(&classifier, codec.spec()).map_err(|e| ChurnError::corrupt("classifier", e))?;
        if metadata.feature_names != codec.spec().names() {
            return Err(ChurnError::corrupt(
                "features",
                "feature list differs from the manifest",
            ));
        }
        Ok(Self { classifier, codec, metadata })
    }

    pub fn classifier(&self) -> &ChurnClassifier {
        &self.classifier
    }

    pub fn codec(&self) -> &CodecState {
        &self.codec
    }

    pub fn spec(&self) -> &FeatureSpec {
        self.codec.spec()
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }
}

fn check_consistent(classifier: &ChurnClassifier, spec: &FeatureSpec) -> Result<()> {
    if !classifier.is_fitted() {
        return Err(ChurnError::ModelNotFitted);
    }
    if classifier.n_features() != spec.len() || classifier.feature_names() != spec.names().as_slice() {
        return Err(ChurnError::ShapeError {
            expected: format!("classifier over [{}]", spec.names().join(", ")),
            actual: format!("classifier over [{}]", classifier.feature_names().join(", ")),
        });
    }
    Ok(())
}
