//! Gradient Boosting implementation
//!
//! A native Rust implementation of gradient boosted decision trees on the
//! logistic loss, in the style of XGBoost: second-order gradient statistics,
//! L2-regularized leaf weights, row and column subsampling per tree.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::DecisionTree;
use crate::error::{ChurnError, Result};

/// Rows above which score updates run in parallel
const PARALLEL_UPDATE_ROWS: usize = 10_000;

/// Probability clamp for the initial log-odds
const BASE_RATE_EPS: f64 = 1e-6;

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    /// L2 regularization
    pub reg_lambda: f64,
    /// Random seed; `None` draws from entropy
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 20,
            learning_rate: 0.3,
            max_depth: 3,
            min_samples_leaf: 1,
            min_child_weight: 1.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, ratio: f64) -> Self {
        self.subsample = ratio;
        self
    }

    pub fn with_colsample_bytree(mut self, ratio: f64) -> Self {
        self.colsample_bytree = ratio;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Check hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ChurnError::invalid_parameter("n_estimators", 0, "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ChurnError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be positive and finite",
            ));
        }
        if self.max_depth == 0 {
            return Err(ChurnError::invalid_parameter("max_depth", 0, "must be at least 1"));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ChurnError::invalid_parameter(name, ratio, "must be in (0, 1]"));
            }
        }
        if !(self.reg_lambda >= 0.0 && self.reg_lambda.is_finite()) {
            return Err(ChurnError::invalid_parameter("reg_lambda", self.reg_lambda, "must be non-negative"));
        }
        if !(self.min_child_weight >= 0.0 && self.min_child_weight.is_finite()) {
            return Err(ChurnError::invalid_parameter(
                "min_child_weight",
                self.min_child_weight,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Gradient Boosting Classifier (binary, logistic loss)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    /// Raw score before any tree (training log-odds)
    base_score: f64,
    feature_importances: Vec<f64>,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            feature_importances: Vec::new(),
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fit on labels in {0, 1}
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(ChurnError::TrainingError("empty training matrix".to_string()));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(ChurnError::TrainingError(format!("labels must be 0 or 1, found {}", bad)));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ChurnError::TrainingError("feature matrix contains non-finite values".to_string()));
        }

        // Initialize with training log-odds
        let rate = y.mean().unwrap_or(0.5).clamp(BASE_RATE_EPS, 1.0 - BASE_RATE_EPS);
        self.base_score = (rate / (1.0 - rate)).ln();
        self.n_features = n_features;
        self.trees.clear();

        let mut raw = vec![self.base_score; n_samples];

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut gains = vec![0.0; n_features];

        for round in 0..self.config.n_estimators {
            let (grad, hess): (Vec<f64>, Vec<f64>) = raw
                .iter()
                .zip(y.iter())
                .map(|(&s, &yi)| {
                    let p = sigmoid(s);
                    (p - yi, (p * (1.0 - p)).max(f64::EPSILON))
                })
                .unzip();

            // Sample rows
            let sample_indices = self.subsample_indices(n_samples, &mut rng);

            // Sample columns
            let col_indices = self.colsample_indices(n_features, &mut rng);

            let mut tree = DecisionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_min_child_weight(self.config.min_child_weight)
                .with_reg_lambda(self.config.reg_lambda);
            tree.fit(x, &grad, &hess, &sample_indices, &col_indices, &mut gains)?;

            // Every training row moves, not only the sampled ones
            let lr = self.config.learning_rate;
            if n_samples > PARALLEL_UPDATE_ROWS {
                raw.par_iter_mut().enumerate().try_for_each(|(i, s)| {
                    *s += lr * tree.predict_row(x.row(i))?;
                    Ok::<(), ChurnError>(())
                })?;
            } else {
                for (i, s) in raw.iter_mut().enumerate() {
                    *s += lr * tree.predict_row(x.row(i))?;
                }
            }

            debug!(round, depth = tree.depth(), leaves = tree.n_leaves(), "Fitted boosting round");
            self.trees.push(tree);
        }

        // Normalize feature importances
        let total: f64 = gains.iter().sum();
        self.feature_importances = if total > 0.0 {
            gains.iter().map(|g| g / total).collect()
        } else {
            vec![1.0 / n_features as f64; n_features]
        };

        Ok(())
    }

    /// Raw additive scores (log-odds)
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(ChurnError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let lr = self.config.learning_rate;
        let scores = x
            .rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .try_fold(self.base_score, |acc, tree| Ok::<f64, ChurnError>(acc + lr * tree.predict_row(row)?))
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from_vec(scores))
    }

    /// Probability of class 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Labels in {0, 1}; 1 iff probability > 0.5
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Get feature importances (share of total split gain)
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = (((n as f64) * self.config.subsample).ceil() as usize).clamp(1, n);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort();
        indices
    }

    fn colsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = (((n as f64) * self.config.colsample_bytree).ceil() as usize).clamp(1, n);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort();
        indices
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2),
            (0..200).map(|i| ((i * 37) % 101) as f64 * 0.1).collect()
        ).unwrap();

        let y: Array1<f64> = x.rows().into_iter()
            .map(|row| if row[0] + row[1] > 10.0 { 1.0 } else { 0.0 })
            .collect();

        (x, y)
    }

    #[test]
    fn test_gradient_boosting_classifier() {
        let (x, y) = create_classification_data();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 100);

        let correct = y.iter()
            .zip(predictions.iter())
            .filter(|(&yi, &pi)| yi == pi)
            .count();
        let accuracy = correct as f64 / y.len() as f64;
        assert!(accuracy > 0.8, "Accuracy ({}) should be above 80%", accuracy);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = create_classification_data();
        let mut a = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        let mut b = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_feature_importances() {
        let (x, y) = create_classification_data();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);
        assert!(importances.iter().all(|&v| v >= 0.0));
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "Sum of importances ({}) should be 1", sum);
    }

    #[test]
    fn test_no_split_gives_uniform_importance() {
        // constant features cannot be split
        let x = Array2::from_elem((10, 4), 1.0);
        let y = Array1::from_iter((0..10).map(|i| (i % 2) as f64));
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default().with_n_estimators(3));
        model.fit(&x, &y).unwrap();
        assert_eq!(model.feature_importances(), &[0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_base_score_is_log_odds() {
        let x = Array2::from_elem((4, 1), 0.0);
        let y = Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]);
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default().with_n_estimators(1));
        model.fit(&x, &y).unwrap();
        assert!((model.base_score - (1.0f64 / 3.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_labels_and_shapes() {
        let x = Array2::from_elem((3, 1), 0.0);
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        assert!(model.fit(&x, &Array1::from_vec(vec![0.0, 2.0, 1.0])).is_err());
        assert!(model.fit(&x, &Array1::from_vec(vec![0.0, 1.0])).is_err());
        assert!(matches!(model.predict(&x), Err(ChurnError::ModelNotFitted)));
    }

    #[test]
    fn test_config_validation() {
        assert!(GradientBoostingConfig::default().validate().is_ok());
        assert!(GradientBoostingConfig::default().with_subsample(0.0).validate().is_err());
        assert!(GradientBoostingConfig::default().with_n_estimators(0).validate().is_err());
        assert!(GradientBoostingConfig::default().with_learning_rate(-0.1).validate().is_err());
    }
}
