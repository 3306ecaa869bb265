//! Second-order regression tree used as the boosting weak learner

use crate::error::{ChurnError, Result};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with its additive raw-score weight
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        gain: f64,
    },
}

/// Best split found for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Gradient statistics of a node
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    grad: f64,
    hess: f64,
}

impl NodeStats {
    fn of(rows: &[usize], grad: &[f64], hess: &[f64]) -> Self {
        rows.iter().fold(Self::default(), |acc, &r| Self {
            grad: acc.grad + grad[r],
            hess: acc.hess + hess[r],
        })
    }

    fn score(&self, lambda: f64) -> f64 {
        self.grad * self.grad / (self.hess + lambda)
    }
}

/// Depth-bounded regression tree fitted on gradients and hessians
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Width of the matrix the tree was fitted on
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: 3,
            min_samples_leaf: 1,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set minimum hessian sum per child
    pub fn with_min_child_weight(mut self, weight: f64) -> Self {
        self.min_child_weight = weight;
        self
    }

    /// Set L2 regularization
    pub fn with_reg_lambda(mut self, lambda: f64) -> Self {
        self.reg_lambda = lambda;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Fit the tree on a row subset using only the given feature columns.
    ///
    /// `features` must be sorted ascending. Split gains are added to
    /// `importances`, indexed by column of `x`.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
        importances: &mut [f64],
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if grad.len() != n_samples || hess.len() != n_samples {
            return Err(ChurnError::ShapeError {
                expected: format!("{} gradients and hessians", n_samples),
                actual: format!("{} gradients, {} hessians", grad.len(), hess.len()),
            });
        }
        if importances.len() != x.ncols() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} importance slots", x.ncols()),
                actual: format!("{} importance slots", importances.len()),
            });
        }
        if rows.is_empty() {
            return Err(ChurnError::TrainingError("cannot fit a tree on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let root = self.build_node(x, grad, hess, rows, features, 0, importances);
        self.root = Some(root);
        Ok(self)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_node(
        &self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let stats = NodeStats::of(rows, grad, hess);
        let leaf = || TreeNode::Leaf {
            value: -stats.grad / (stats.hess + self.reg_lambda),
            n_samples: rows.len(),
        };

        if depth >= self.max_depth || rows.len() < 2 * self.min_samples_leaf {
            return leaf();
        }

        let best = match self.find_best_split(x, grad, hess, rows, features, stats) {
            Some(split) => split,
            None => return leaf(),
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| x[[r, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += best.gain;

        let left = self.build_node(x, grad, hess, &left_rows, features, depth + 1, importances);
        let right = self.build_node(x, grad, hess, &right_rows, features, depth + 1, importances);

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples: rows.len(),
            gain: best.gain,
        }
    }

    /// Search every candidate feature in parallel.
    ///
    /// Candidates come back in feature order and only a strictly larger gain
    /// replaces the incumbent, so ties go to the lowest feature index.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        features: &[usize],
        parent: NodeStats,
    ) -> Option<SplitCandidate> {
        let candidates: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&f| self.best_split_for_feature(x, grad, hess, rows, f, parent))
            .collect();

        candidates
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, c| match best {
                Some(b) if b.gain >= c.gain => Some(b),
                _ => Some(c),
            })
    }

    /// Sorted sweep over one feature with prefix sums of gradient statistics
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        feature_idx: usize,
        parent: NodeStats,
    ) -> Option<SplitCandidate> {
        let mut sorted: Vec<(f64, usize)> = rows.iter().map(|&r| (x[[r, feature_idx]], r)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let lambda = self.reg_lambda;
        let parent_score = parent.score(lambda);
        let n = sorted.len();
        let mut left = NodeStats::default();
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n - 1 {
            let (value, row) = sorted[i];
            left.grad += grad[row];
            left.hess += hess[row];

            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            if n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                continue;
            }
            let right = NodeStats {
                grad: parent.grad - left.grad,
                hess: parent.hess - left.hess,
            };
            if left.hess < self.min_child_weight || right.hess < self.min_child_weight {
                continue;
            }

            let gain = 0.5 * (left.score(lambda) + right.score(lambda) - parent_score);
            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: midpoint(value, next),
                    gain,
                });
            }
        }

        best
    }

    /// Raw-score contribution of one row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(ChurnError::ModelNotFitted)?;
        if row.len() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", row.len()),
            });
        }
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Depth of the fitted tree (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }

    pub fn n_leaves(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => walk(left) + walk(right),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }
}

/// Threshold strictly below `hi` so that `hi` always goes right
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}
