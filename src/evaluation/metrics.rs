//! Binary classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ChurnError, Result};

/// Confusion counts for the positive (churned) class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionMatrix {
    pub fn new(tn: usize, fp: usize, fn_: usize, tp: usize) -> Self {
        Self { tn, fp, fn_, tp }
    }

    /// Count outcomes; values above 0.5 are the positive class
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// Actual positives (TP + FN)
    pub fn positives(&self) -> usize {
        self.tp + self.fn_
    }

    /// Actual negatives (TN + FP)
    pub fn negatives(&self) -> usize {
        self.tn + self.fp
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall, also called sensitivity
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.positives())
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.negatives())
    }

    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.fp, self.negatives())
    }

    pub fn false_negative_rate(&self) -> f64 {
        ratio(self.fn_, self.positives())
    }

    pub fn balanced_accuracy(&self) -> f64 {
        (self.recall() + self.specificity()) / 2.0
    }

    /// Precision of the negative (retained) class
    pub fn negative_predictive_value(&self) -> f64 {
        ratio(self.tn, self.tn + self.fn_)
    }
}

/// Scalar metrics derived from a confusion matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub specificity: f64,
    pub sensitivity: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub balanced_accuracy: f64,
    /// `None` when undefined (single-class holdout)
    pub roc_auc: Option<f64>,
}

impl ClassificationMetrics {
    pub fn from_confusion(cm: &ConfusionMatrix, roc_auc: Option<f64>) -> Self {
        Self {
            accuracy: cm.accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1_score: cm.f1(),
            specificity: cm.specificity(),
            sensitivity: cm.recall(),
            false_positive_rate: cm.false_positive_rate(),
            false_negative_rate: cm.false_negative_rate(),
            balanced_accuracy: cm.balanced_accuracy(),
            roc_auc,
        }
    }
}

/// Area under the ROC curve.
///
/// Trapezoidal rule over the full threshold sweep; rows with equal scores
/// move the curve in one diagonal step. Fails with `DegenerateMetric` when
/// `y_true` holds a single class.
pub fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_score.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", y_score.len()),
        });
    }
    if y_score.iter().any(|s| !s.is_finite()) {
        return Err(ChurnError::InvalidInput("scores must be finite".to_string()));
    }

    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(ChurnError::DegenerateMetric {
            metric: "roc_auc".to_string(),
            reason: format!("holdout has a single class ({} positive, {} negative)", n_pos, n_neg),
        });
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let (mut prev_tp, mut prev_fp) = (0usize, 0usize);
    let mut area = 0.0;

    let mut i = 0;
    while i < order.len() {
        let score = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == score {
            if y_true[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        area += (fp - prev_fp) as f64 * (tp + prev_tp) as f64 / 2.0;
        prev_tp = tp;
        prev_fp = fp;
    }

    Ok(area / (n_pos as f64 * n_neg as f64))
}

/// Precision, recall, f1 and support of one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ClassReport {
    fn new(precision: f64, recall: f64, support: usize) -> Self {
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self { precision, recall, f1_score, support }
    }
}

/// Per-class breakdown with macro and support-weighted averages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Class 0
    pub retained: ClassReport,
    /// Class 1
    pub churned: ClassReport,
    pub macro_avg: ClassReport,
    pub weighted_avg: ClassReport,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let retained = ClassReport::new(cm.negative_predictive_value(), cm.specificity(), cm.negatives());
        let churned = ClassReport::new(cm.precision(), cm.recall(), cm.positives());
        let total = cm.total();

        let macro_avg = ClassReport {
            precision: (retained.precision + churned.precision) / 2.0,
            recall: (retained.recall + churned.recall) / 2.0,
            f1_score: (retained.f1_score + churned.f1_score) / 2.0,
            support: total,
        };

        let weigh = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * retained.support as f64 + b * churned.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassReport {
            precision: weigh(retained.precision, churned.precision),
            recall: weigh(retained.recall, churned.recall),
            f1_score: weigh(retained.f1_score, churned.f1_score),
            support: total,
        };

        Self { retained, churned, macro_avg, weighted_avg }
    }
}

/// Holdout evaluation of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub confusion_matrix: ConfusionMatrix,
    pub metrics: ClassificationMetrics,
    pub class_report: ClassificationReport,
    pub n_samples: usize,
}

/// Computes the metric suite on holdout predictions
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngine;

impl MetricsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate labels and churn probabilities against the truth.
    ///
    /// An undefined ROC-AUC is recorded as `None` rather than failing.
    pub fn evaluate(
        &self,
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_score: &Array1<f64>,
    ) -> Result<EvaluationResult> {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred)?;

        let auc = match roc_auc(y_true, y_score) {
            Ok(v) => Some(v),
            Err(ChurnError::DegenerateMetric { metric, reason }) => {
                warn!(%metric, %reason, "Metric undefined");
                None
            }
            Err(e) => return Err(e),
        };

        let metrics = ClassificationMetrics::from_confusion(&cm, auc);
        info!(
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1_score,
            roc_auc = ?metrics.roc_auc,
            "Evaluated holdout"
        );

        Ok(EvaluationResult {
            confusion_matrix: cm,
            metrics,
            class_report: ClassificationReport::from_confusion(&cm),
            n_samples: cm.total(),
        })
    }
}
