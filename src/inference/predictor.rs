//! Single-customer churn prediction against a loaded bundle

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::dataset::schema::ID_COLUMN;
use crate::dataset::{FieldValue, Record};
use crate::error::{ChurnError, Result};
use crate::export::{ArtifactStore, ModelArtifact};

/// Probability above which a customer is predicted to churn
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Coarse churn risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// `p > 0.7` is High, `p > 0.4` is Medium, anything else Low
    pub fn from_probability(p: f64) -> Self {
        if p > 0.7 {
            RiskTier::High
        } else if p > 0.4 {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Outcome of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 = churn, 0 = retained
    pub predicted_label: u8,
    pub churn_probability: f64,
    pub risk_tier: RiskTier,
}

impl PredictionResult {
    pub fn from_probability(p: f64) -> Self {
        Self {
            predicted_label: u8::from(p > DECISION_THRESHOLD),
            churn_probability: p,
            risk_tier: RiskTier::from_probability(p),
        }
    }
}

/// Order a record's values by the artifact's feature spec.
///
/// Missing or blank features and unknown fields are reported together; the
/// customer id column is ignored.
pub fn ordered_values(artifact: &ModelArtifact, record: &Record) -> Result<Vec<FieldValue>> {
    let spec = artifact.spec();

    let missing: Vec<String> = spec
        .features()
        .iter()
        .filter(|f| record.get(&f.name).map_or(true, FieldValue::is_blank))
        .map(|f| f.name.clone())
        .collect();
    let unexpected: Vec<String> = record
        .field_names()
        .filter(|name| *name != ID_COLUMN && spec.position(name).is_none())
        .map(str::to_string)
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(ChurnError::FeatureMismatch { missing, unexpected });
    }

    Ok(spec
        .features()
        .iter()
        .filter_map(|f| record.get(&f.name).cloned())
        .collect())
}

/// Predict one record; the artifact is only read
pub fn predict_one(artifact: &ModelArtifact, record: &Record) -> Result<PredictionResult> {
    let values = ordered_values(artifact, record)?;
    let encoded = artifact.codec().transform_row(&values)?;
    let p = artifact.classifier().predict_proba_row(&encoded)?;
    debug!(probability = p, "Predicted churn");
    Ok(PredictionResult::from_probability(p))
}

/// Shareable predictor over one loaded bundle
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: Arc<ModelArtifact>,
}

impl Predictor {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact: Arc::new(artifact) }
    }

    /// Load the bundle from a store
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        Ok(Self::new(store.load()?))
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn predict_one(&self, record: &Record) -> Result<PredictionResult> {
        predict_one(&self.artifact, record)
    }

    /// One result per record, in input order; failures stay with their record
    pub fn predict_batch(&self, records: &[Record]) -> Vec<Result<PredictionResult>> {
        records
            .par_iter()
            .map(|record| predict_one(&self.artifact, record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_tier_boundaries() {
        assert_eq!(RiskTier::from_probability(0.71), RiskTier::High);
        assert_eq!(RiskTier::from_probability(0.7), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.41), RiskTier::Medium);
        assert_eq!(RiskTier::from_probability(0.4), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.0), RiskTier::Low);
    }

    #[test]
    fn test_label_threshold() {
        assert_eq!(PredictionResult::from_probability(0.5).predicted_label, 0);
        assert_eq!(PredictionResult::from_probability(0.5001).predicted_label, 1);
    }

    #[test]
    fn test_predictor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();
    }
}
