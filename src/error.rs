//! Error types for the churn engine

use thiserror::Error;

/// Result type alias for churn engine operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Main error type for the churn engine
#[derive(Error, Debug)]
pub enum ChurnError {
    /// Required input columns are absent. Fatal for a training run.
    #[error("Schema error: missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Not enough usable rows, or a degenerate label, after cleaning.
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// Categorical value that the training-time codec never observed.
    #[error("Unseen category for feature '{feature}': '{value}'")]
    UnseenCategory { feature: String, value: String },

    #[error("Invalid value for feature '{feature}': '{value}'")]
    InvalidValue { feature: String, value: String },

    /// Record fields do not match the trained feature list.
    #[error("Feature mismatch: missing [{}], unexpected [{}]", missing.join(", "), unexpected.join(", "))]
    FeatureMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Artifact corrupt: {part}: {reason}")]
    ArtifactCorrupt { part: String, reason: String },

    /// Metric that cannot be computed on the given data (e.g. ROC-AUC on one class).
    #[error("Metric '{metric}' is undefined: {reason}")]
    DegenerateMetric { metric: String, reason: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ChurnError {
    pub(crate) fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ChurnError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(part: impl Into<String>, reason: impl ToString) -> Self {
        ChurnError::ArtifactCorrupt {
            part: part.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for ChurnError {
    fn from(err: polars::error::PolarsError) -> Self {
        ChurnError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for ChurnError {
    fn from(err: bincode::Error) -> Self {
        ChurnError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChurnError::DataQuality("only 3 usable rows".to_string());
        assert_eq!(err.to_string(), "Data quality error: only 3 usable rows");
    }

    #[test]
    fn test_schema_error_lists_columns() {
        let err = ChurnError::Schema {
            missing: vec!["ocupacion (occupation)".to_string(), "edad (age)".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("ocupacion (occupation)"));
        assert!(msg.contains("edad (age)"));
    }

    #[test]
    fn test_unseen_category_names_feature_and_value() {
        let err = ChurnError::UnseenCategory {
            feature: "nacionalidad".to_string(),
            value: "Atlantis".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unseen category for feature 'nacionalidad': 'Atlantis'"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChurnError = io_err.into();
        assert!(matches!(err, ChurnError::IoError(_)));
    }
}
