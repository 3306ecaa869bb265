//! Inference module
//!
//! Applies a loaded model bundle to customer records:
//! - Strict feature validation against the trained feature list
//! - Encoding with the persisted codec, never refitted
//! - Churn probability, label and risk tier
//! - Parallel batch prediction with per-record results

mod predictor;

pub use predictor::{
    ordered_values, predict_one, PredictionResult, Predictor, RiskTier, DECISION_THRESHOLD,
};
