//! Model training module
//!
//! Provides the churn classifier and its building blocks:
//! - Second-order regression trees
//! - Gradient boosting on the logistic loss with row/column subsampling
//! - A classifier wrapper binding the ensemble to named features

pub mod classifier;
pub mod decision_tree;
pub mod gradient_boosting;

pub use classifier::ChurnClassifier;
pub use decision_tree::{DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
