//! Model evaluation module
//!
//! Provides holdout evaluation of the churn classifier:
//! - Confusion matrix and derived rates
//! - ROC-AUC over the full threshold sweep
//! - Threshold-ladder interpretation and recommendations
//! - The persisted evaluation report

pub mod interpretation;
mod metrics;
mod report;

pub use interpretation::{Interpretation, MetricInterpretation, OverallAssessment, Recommendation};
pub use metrics::{
    roc_auc, ClassReport, ClassificationMetrics, ClassificationReport, ConfusionMatrix, EvaluationResult,
    MetricsEngine,
};
pub use report::{ConfusionBreakdown, ConfusionCell, EvaluationReport, FeatureImportanceEntry, PrincipalMetrics};
