//! Evaluation report persisted beside the model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interpretation::Interpretation;
use super::metrics::{ClassificationMetrics, ClassificationReport, ConfusionMatrix, EvaluationResult};
use crate::dataset::schema::FEATURE_COLUMNS;
use crate::dataset::DatasetSummary;

/// One cell of the 2x2 confusion breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionCell {
    pub key: String,
    pub count: usize,
    /// Share of the holdout in this cell
    pub share: f64,
    pub description: String,
}

/// Confusion matrix laid out for display: rows are actual, columns predicted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionBreakdown {
    pub counts: ConfusionMatrix,
    /// `[[TN, FP], [FN, TP]]`
    pub cells: [[ConfusionCell; 2]; 2],
}

impl ConfusionBreakdown {
    pub fn new(cm: ConfusionMatrix) -> Self {
        let total = cm.total();
        let cell = |key: &str, count: usize, description: &str| ConfusionCell {
            key: key.to_string(),
            count,
            share: if total == 0 { 0.0 } else { count as f64 / total as f64 },
            description: description.to_string(),
        };
        Self {
            counts: cm,
            cells: [
                [
                    cell("true_negative", cm.tn, "correctly classified as retained"),
                    cell("false_positive", cm.fp, "wrongly flagged as churn"),
                ],
                [
                    cell("false_negative", cm.fn_, "churn not detected"),
                    cell("true_positive", cm.tp, "correctly classified as churn"),
                ],
            ],
        }
    }
}

/// Importance of one feature, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceEntry {
    pub feature: String,
    pub description: String,
    pub importance: f64,
    pub percentage: String,
}

impl FeatureImportanceEntry {
    pub fn new(feature: impl Into<String>, importance: f64) -> Self {
        let feature = feature.into();
        let description = FEATURE_COLUMNS
            .iter()
            .find(|c| c.name == feature)
            .map_or_else(|| feature.clone(), |c| c.description.to_string());
        Self {
            percentage: format!("{:.2}%", importance * 100.0),
            feature,
            description,
            importance,
        }
    }
}

/// Principal metrics as shown first in the report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: Option<f64>,
}

/// Complete holdout evaluation of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub created_at: DateTime<Utc>,
    pub metrics: PrincipalMetrics,
    pub confusion_matrix: ConfusionBreakdown,
    pub advanced_metrics: ClassificationMetrics,
    pub class_report: ClassificationReport,
    /// Sorted from most to least important
    pub feature_importance: Vec<FeatureImportanceEntry>,
    pub dataset: DatasetSummary,
    pub interpretation: Interpretation,
    pub training_time_secs: f64,
}

impl EvaluationReport {
    /// `ranked_importance` is expected in descending order
    pub fn new(
        result: &EvaluationResult,
        ranked_importance: &[(String, f64)],
        dataset: DatasetSummary,
        training_time_secs: f64,
    ) -> Self {
        let m = result.metrics;
        Self {
            created_at: Utc::now(),
            metrics: PrincipalMetrics {
                accuracy: m.accuracy,
                precision: m.precision,
                recall: m.recall,
                f1_score: m.f1_score,
                roc_auc: m.roc_auc,
            },
            confusion_matrix: ConfusionBreakdown::new(result.confusion_matrix),
            advanced_metrics: m,
            class_report: result.class_report,
            feature_importance: ranked_importance
                .iter()
                .map(|(name, value)| FeatureImportanceEntry::new(name.clone(), *value))
                .collect(),
            dataset,
            interpretation: Interpretation::from_result(result),
            training_time_secs,
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
