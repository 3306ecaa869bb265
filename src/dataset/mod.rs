//! Customer dataset module
//!
//! Provides loading and preparation of the customer table:
//! - Schema validation and churn label derivation
//! - Cleaning of incomplete rows
//! - Stratified train/holdout split
//! - Record types shared by training and inference

mod loader;
mod preparer;
pub mod schema;

pub use loader::DatasetLoader;
pub use preparer::{
    CleanTable, DatasetPreparer, DatasetSplit, DatasetSummary, LabeledRow, LabeledTable, PreparedDataset,
};
pub use schema::{ChurnIndicator, FeatureDef, FeatureKind, FeatureSpec, LabelPolarity};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view; text is parsed after trimming
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Canonical category string.
    ///
    /// Integral numbers render without a fraction so that `1`, `1.0` and `"1"`
    /// name the same category.
    pub fn as_category(&self) -> String {
        match self {
            FieldValue::Number(v) => canonical_number(*v),
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<f64>() {
                    Ok(v) if v.is_finite() => canonical_number(v),
                    _ => trimmed.to_string(),
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

fn canonical_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// One customer as a mapping from field name to value.
///
/// This is the inference request shape; it deserializes from a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a field
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A complete, labeled customer row in feature-spec order
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRow {
    pub customer_id: String,
    pub values: Vec<FieldValue>,
    pub churned: bool,
}

impl CustomerRow {
    pub fn label(&self) -> f64 {
        if self.churned { 1.0 } else { 0.0 }
    }
}

impl AsRef<[FieldValue]> for CustomerRow {
    fn as_ref(&self) -> &[FieldValue] {
        &self.values
    }
}
