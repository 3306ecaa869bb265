//! Standard scaling of numeric features

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted (mean, std) of one numeric feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
}

impl ScalerParams {
    /// Fit from the training values of one column
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self { mean, std: var.sqrt() }
    }

    /// `(value - mean) / std`.
    ///
    /// A constant training column (`std == 0`) maps every value to 0.
    // TODO: revisit the zero-variance policy; dropping constant features at fit time may be preferable.
    pub fn transform(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            0.0
        } else {
            (value - self.mean) / self.std
        }
    }
}

/// Standard scaler over named numeric features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StandardScaler {
    params: BTreeMap<String, ScalerParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<String>, params: ScalerParams) {
        self.params.insert(feature.into(), params);
    }

    pub fn get(&self, feature: &str) -> Option<&ScalerParams> {
        self.params.get(feature)
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
