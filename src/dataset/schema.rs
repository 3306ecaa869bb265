//! Column layout of the customer table and the trained feature list

use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Kind of a model feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Finite string domain, label encoded
    Categorical,
    /// Real valued, optionally standardized
    Numeric,
}

/// Static description of one input column
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FeatureKind,
}

impl ColumnSpec {
    const fn categorical(name: &'static str, description: &'static str) -> Self {
        Self { name, description, kind: FeatureKind::Categorical }
    }

    const fn numeric(name: &'static str, description: &'static str) -> Self {
        Self { name, description, kind: FeatureKind::Numeric }
    }

    /// `column (description)`, the form used in error messages
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.description)
    }
}

/// Customer identifier; required but never a model input
pub const ID_COLUMN: &str = "ClienteID";

/// Model inputs in training order
pub const FEATURE_COLUMNS: [ColumnSpec; 9] = [
    ColumnSpec::numeric("edad", "age"),
    ColumnSpec::categorical("sexo", "sex"),
    ColumnSpec::categorical("estado_civil", "marital status"),
    ColumnSpec::categorical("nacionalidad", "nationality"),
    ColumnSpec::categorical("nivel_educativo", "education level"),
    ColumnSpec::numeric("ingresos_mensuales", "monthly income"),
    ColumnSpec::categorical("ocupacion", "occupation"),
    ColumnSpec::categorical("nivel_riesgo_crediticio", "credit risk tier"),
    ColumnSpec::categorical("tarjeta_credito", "has credit card"),
];

/// What a churn-indicator column measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelPolarity {
    /// 1 means the customer churned
    Churned,
    /// 1 means the customer is still active; the label is the negation
    Active,
}

/// A recognized source column for the binary target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChurnIndicator {
    pub column: &'static str,
    pub polarity: LabelPolarity,
}

/// Candidate label columns, highest priority first. First present column wins.
pub const CHURN_INDICATORS: [ChurnIndicator; 4] = [
    ChurnIndicator { column: "fuga", polarity: LabelPolarity::Churned },
    ChurnIndicator { column: "desercion", polarity: LabelPolarity::Churned },
    ChurnIndicator { column: "churn", polarity: LabelPolarity::Churned },
    ChurnIndicator { column: "cliente_activo", polarity: LabelPolarity::Active },
];

/// Pick the first indicator whose column is present
pub fn select_indicator<S: AsRef<str>>(columns: &[S]) -> Option<ChurnIndicator> {
    CHURN_INDICATORS
        .iter()
        .find(|ind| columns.iter().any(|c| c.as_ref() == ind.column))
        .copied()
}

/// Check the header against the required columns.
///
/// Reports every absent column at once, then the indicator candidates if none
/// of them is present.
pub fn validate_columns<S: AsRef<str>>(columns: &[S]) -> Result<ChurnIndicator> {
    let present = |name: &str| columns.iter().any(|c| c.as_ref() == name);

    let mut missing: Vec<String> = Vec::new();
    if !present(ID_COLUMN) {
        missing.push(format!("{} (customer identifier)", ID_COLUMN));
    }
    missing.extend(
        FEATURE_COLUMNS
            .iter()
            .filter(|col| !present(col.name))
            .map(ColumnSpec::display_name),
    );

    let indicator = select_indicator(columns);
    if indicator.is_none() {
        let candidates: Vec<&str> = CHURN_INDICATORS.iter().map(|i| i.column).collect();
        missing.push(format!("one of [{}] (churn indicator)", candidates.join(", ")));
    }

    match indicator {
        Some(ind) if missing.is_empty() => Ok(ind),
        _ => Err(ChurnError::Schema { missing }),
    }
}

/// One feature of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub name: String,
    pub kind: FeatureKind,
    /// Only meaningful for numeric features
    pub standardize: bool,
}

/// Ordered feature list fixed at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    features: Vec<FeatureDef>,
}

impl FeatureSpec {
    pub fn new(features: Vec<FeatureDef>) -> Result<Self> {
        if features.is_empty() {
            return Err(ChurnError::InvalidInput("feature spec cannot be empty".to_string()));
        }
        for (i, f) in features.iter().enumerate() {
            if features[..i].iter().any(|g| g.name == f.name) {
                return Err(ChurnError::InvalidInput(format!("duplicate feature '{}'", f.name)));
            }
        }
        Ok(Self { features })
    }

    /// Feature spec of the customer churn table
    pub fn churn_default() -> Self {
        Self {
            features: FEATURE_COLUMNS
                .iter()
                .map(|c| FeatureDef {
                    name: c.name.to_string(),
                    kind: c.kind,
                    standardize: c.kind == FeatureKind::Numeric,
                })
                .collect(),
        }
    }

    pub fn features(&self) -> &[FeatureDef] {
        &self.features
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }
}
