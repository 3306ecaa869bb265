//! Churn classifier: the boosting ensemble bound to named features

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use crate::error::{ChurnError, Result};

/// Binary churn classifier over a fixed, named feature list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnClassifier {
    model: GradientBoostingClassifier,
    feature_names: Vec<String>,
}

impl ChurnClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            model: GradientBoostingClassifier::new(config),
            feature_names: Vec::new(),
        }
    }

    /// Fit on encoded rows; `feature_names` labels the columns of `x`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, feature_names: &[String]) -> Result<()> {
        if feature_names.len() != x.ncols() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} feature names", x.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        self.model.fit(x, y)?;
        self.feature_names = feature_names.to_vec();

        info!(
            rows = x.nrows(),
            features = x.ncols(),
            trees = self.model.n_trees(),
            "Trained churn classifier"
        );
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_fitted()
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        self.model.config()
    }

    pub fn n_features(&self) -> usize {
        self.model.n_features()
    }

    pub fn n_trees(&self) -> usize {
        self.model.n_trees()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Labels in {0, 1}
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict(x)
    }

    /// Churn probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict_proba(x)
    }

    /// Churn probability of a single encoded row
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<f64> {
        let x = ArrayView1::from(row)
            .into_shape_with_order((1, row.len()))?
            .to_owned();
        Ok(self.model.predict_proba(&x)?[0])
    }

    /// Feature name to share of total split gain; sums to 1
    pub fn feature_importance(&self) -> Result<BTreeMap<String, f64>> {
        if !self.is_fitted() {
            return Err(ChurnError::ModelNotFitted);
        }
        Ok(self
            .feature_names
            .iter()
            .cloned()
            .zip(self.model.feature_importances().iter().copied())
            .collect())
    }

    /// Importances sorted from most to least important
    pub fn ranked_importance(&self) -> Result<Vec<(String, f64)>> {
        let mut ranked: Vec<(String, f64)> = self.feature_importance()?.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }
}
