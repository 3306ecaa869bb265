//! Human-readable interpretation of evaluation metrics
//!
//! Every metric has a descending threshold ladder whose last rung starts at
//! 0.0; the first rung the value reaches decides the label. The combined
//! assessment and the recommendations are ordered rule tables.

use serde::{Deserialize, Serialize};

use super::metrics::{ConfusionMatrix, EvaluationResult};

/// One step of an interpretation ladder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rung {
    pub threshold: f64,
    pub label: &'static str,
    pub description: &'static str,
}

const fn rung(threshold: f64, label: &'static str, description: &'static str) -> Rung {
    Rung { threshold, label, description }
}

pub const ACCURACY_LADDER: [Rung; 5] = [
    rung(0.90, "excellent", "excellent overall accuracy"),
    rung(0.80, "good", "good overall accuracy"),
    rung(0.70, "acceptable", "acceptable accuracy"),
    rung(0.60, "fair", "fair accuracy, needs improvement"),
    rung(0.0, "insufficient", "insufficient accuracy"),
];

pub const PRECISION_LADDER: [Rung; 5] = [
    rung(0.90, "very_high", "very high reliability of churn predictions"),
    rung(0.80, "high", "high reliability of churn predictions"),
    rung(0.70, "acceptable", "acceptable reliability"),
    rung(0.60, "low", "many false positives"),
    rung(0.0, "very_low", "too many false positives"),
];

pub const RECALL_LADDER: [Rung; 5] = [
    rung(0.90, "very_high", "detects almost every churn case"),
    rung(0.80, "high", "detects most churn cases"),
    rung(0.70, "acceptable", "detects an acceptable share of churn cases"),
    rung(0.60, "low", "misses many churn cases"),
    rung(0.0, "very_low", "does not detect churn cases adequately"),
];

pub const F1_LADDER: [Rung; 5] = [
    rung(0.85, "excellent", "excellent balance between precision and recall"),
    rung(0.75, "good", "good overall balance"),
    rung(0.65, "acceptable", "acceptable balance"),
    rung(0.50, "poor", "poor balance, adjust the decision threshold"),
    rung(0.0, "very_poor", "very poor balance"),
];

pub const ROC_AUC_LADDER: [Rung; 5] = [
    rung(0.90, "excellent", "excellent discrimination ability"),
    rung(0.80, "good", "good discrimination ability"),
    rung(0.70, "acceptable", "acceptable discrimination ability"),
    rung(0.60, "limited", "limited discrimination ability"),
    rung(0.0, "very_limited", "very limited or random discrimination"),
];

/// First rung whose threshold `value` reaches; the last rung catches the rest
pub fn classify(ladder: &[Rung], value: f64) -> Option<&Rung> {
    ladder
        .iter()
        .find(|r| value >= r.threshold)
        .or_else(|| ladder.last())
}

/// Label and description for a single metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInterpretation {
    pub value: Option<f64>,
    pub label: String,
    pub description: String,
}

impl MetricInterpretation {
    pub fn from_ladder(ladder: &[Rung], value: f64) -> Self {
        match classify(ladder, value) {
            Some(r) => Self {
                value: Some(value),
                label: r.label.to_string(),
                description: r.description.to_string(),
            },
            None => Self::undefined(),
        }
    }

    pub fn undefined() -> Self {
        Self {
            value: None,
            label: "undefined".to_string(),
            description: "metric cannot be computed on this holdout".to_string(),
        }
    }
}

/// Combined verdict over accuracy and f1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallAssessment {
    Excellent,
    Good,
    Regular,
    Poor,
}

impl OverallAssessment {
    pub fn description(&self) -> &'static str {
        match self {
            OverallAssessment::Excellent => "excellent: high overall performance and a good balance",
            OverallAssessment::Good => "good: acceptable performance that can still be improved",
            OverallAssessment::Regular => "regular: the model needs significant improvements",
            OverallAssessment::Poor => "poor: the dataset and features need a complete review",
        }
    }
}

/// `(min accuracy, min f1, verdict)`, tried in order; anything else is Poor
const ASSESSMENT_RULES: [(f64, f64, OverallAssessment); 3] = [
    (0.85, 0.70, OverallAssessment::Excellent),
    (0.75, 0.60, OverallAssessment::Good),
    (0.65, 0.0, OverallAssessment::Regular),
];

pub fn assess(accuracy: f64, f1: f64) -> OverallAssessment {
    ASSESSMENT_RULES
        .iter()
        .find(|(min_acc, min_f1, _)| accuracy >= *min_acc && f1 >= *min_f1)
        .map_or(OverallAssessment::Poor, |(_, _, verdict)| *verdict)
}

/// Actionable advice triggered by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub finding: String,
    pub actions: Vec<String>,
}

struct RecommendationRule {
    applies: fn(&EvaluationResult) -> bool,
    finding: &'static str,
    actions: &'static [&'static str],
}

fn many_false_negatives(cm: &ConfusionMatrix) -> bool {
    cm.fn_ > cm.fp * 2
}

fn many_false_positives(cm: &ConfusionMatrix) -> bool {
    cm.fp > cm.fn_ * 2
}

const RECOMMENDATION_RULES: [RecommendationRule; 5] = [
    RecommendationRule {
        applies: |r| r.metrics.precision > 0.85 && r.metrics.recall < 0.75,
        finding: "the model is precise but misses churn cases",
        actions: &[
            "lower the decision threshold to raise recall",
            "analyze the characteristics of the false negatives",
        ],
    },
    RecommendationRule {
        applies: |r| r.metrics.recall > 0.85 && r.metrics.precision < 0.75,
        finding: "the model detects most churn cases but raises false positives",
        actions: &[
            "raise the decision threshold to reduce false positives",
            "review the features that cause confusion",
        ],
    },
    RecommendationRule {
        applies: |r| r.metrics.accuracy < 0.80,
        finding: "overall accuracy is below 0.80",
        actions: &[
            "collect more training data",
            "engineer additional features",
            "try different hyperparameters",
        ],
    },
    RecommendationRule {
        applies: |r| many_false_negatives(&r.confusion_matrix),
        finding: "many churn cases go undetected (high false negatives), which can lose customers",
        actions: &["prioritize recall over precision"],
    },
    RecommendationRule {
        applies: |r| many_false_positives(&r.confusion_matrix),
        finding: "many false alarms (high false positives), which can cause alert fatigue",
        actions: &["prioritize precision over recall"],
    },
];

/// Every matching recommendation, in rule order
pub fn recommendations(result: &EvaluationResult) -> Vec<Recommendation> {
    RECOMMENDATION_RULES
        .iter()
        .filter(|rule| (rule.applies)(result))
        .map(|rule| Recommendation {
            finding: rule.finding.to_string(),
            actions: rule.actions.iter().map(|a| a.to_string()).collect(),
        })
        .collect()
}

/// Full interpretation of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub accuracy: MetricInterpretation,
    pub precision: MetricInterpretation,
    pub recall: MetricInterpretation,
    pub f1_score: MetricInterpretation,
    pub roc_auc: MetricInterpretation,
    pub overall: OverallAssessment,
    pub overall_description: String,
    pub recommendations: Vec<Recommendation>,
}

impl Interpretation {
    pub fn from_result(result: &EvaluationResult) -> Self {
        let m = &result.metrics;
        let overall = assess(m.accuracy, m.f1_score);
        Self {
            accuracy: MetricInterpretation::from_ladder(&ACCURACY_LADDER, m.accuracy),
            precision: MetricInterpretation::from_ladder(&PRECISION_LADDER, m.precision),
            recall: MetricInterpretation::from_ladder(&RECALL_LADDER, m.recall),
            f1_score: MetricInterpretation::from_ladder(&F1_LADDER, m.f1_score),
            roc_auc: m
                .roc_auc
                .map_or_else(MetricInterpretation::undefined, |v| {
                    MetricInterpretation::from_ladder(&ROC_AUC_LADDER, v)
                }),
            overall,
            overall_description: overall.description().to_string(),
            recommendations: recommendations(result),
        }
    }
}
