//! Categorical label encoding

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Label encoder for one categorical feature.
///
/// Classes are kept sorted, so the code of a value is its rank among the
/// values observed during fit. Lookup of an unobserved value fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fit from the observed values of one column
    pub fn fit<'a, I>(feature: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let observed: BTreeSet<&str> = values.into_iter().collect();
        if observed.is_empty() {
            return Err(ChurnError::InvalidInput(format!(
                "cannot fit encoder for '{}' without values",
                feature
            )));
        }

        let classes = observed.into_iter().map(str::to_string).collect();
        Ok(Self { classes })
    }

    /// Code of a value, or `UnseenCategory`
    pub fn encode(&self, feature: &str, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_err(|_| ChurnError::UnseenCategory {
                feature: feature.to_string(),
                value: value.to_string(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Structural check used when a persisted encoder is read back
    pub(crate) fn is_consistent(&self) -> bool {
        !self.classes.is_empty() && self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

/// Encoders for all categorical features, keyed by feature name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryEncoders {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl CategoryEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<String>, encoder: CategoryEncoder) {
        self.encoders.insert(feature.into(), encoder);
    }

    pub fn get(&self, feature: &str) -> Option<&CategoryEncoder> {
        self.encoders.get(feature)
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_sorted_order() {
        let values = ["Soltero", "Casado", "Viudo", "Casado"];
        let enc = CategoryEncoder::fit("estado_civil", values.iter().copied()).unwrap();
        assert_eq!(enc.classes(), &["Casado", "Soltero", "Viudo"]);
        assert_eq!(enc.encode("estado_civil", "Casado").unwrap(), 0);
        assert_eq!(enc.encode("estado_civil", "Viudo").unwrap(), 2);
        assert_eq!(enc.len(), 3);
    }

    #[test]
    fn test_unseen_value_is_rejected() {
        let enc = CategoryEncoder::fit("sexo", ["M", "F"].iter().copied()).unwrap();
        match enc.encode("sexo", "X") {
            Err(ChurnError::UnseenCategory { feature, value }) => {
                assert_eq!(feature, "sexo");
                assert_eq!(value, "X");
            }
            other => panic!("expected unseen category, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_fit_fails() {
        let empty: [&str; 0] = [];
        assert!(CategoryEncoder::fit("sexo", empty.iter().copied()).is_err());
    }

    #[test]
    fn test_unsorted_persisted_classes_are_inconsistent() {
        let enc: CategoryEncoder = serde_json::from_str(r#"{"classes": ["Soltero", "Casado"]}"#).unwrap();
        assert!(!enc.is_consistent());
        let dup: CategoryEncoder = serde_json::from_str(r#"{"classes": ["M", "M"]}"#).unwrap();
        assert!(!dup.is_consistent());
        assert!(CategoryEncoder::fit("sexo", ["M", "F"].iter().copied()).unwrap().is_consistent());
    }

    #[test]
    fn test_encoders_serialize_as_map() {
        let mut encoders = CategoryEncoders::new();
        encoders.insert("sexo", CategoryEncoder::fit("sexo", ["M", "F"].iter().copied()).unwrap());
        let json = serde_json::to_string(&encoders).unwrap();
        assert!(json.starts_with("{\"sexo\":"));
        let back: CategoryEncoders = serde_json::from_str(&json).unwrap();
        assert_eq!(back, encoders);
    }
}
