//! Feature codec: fit once on training rows, transform anything afterwards

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::encoder::{CategoryEncoder, CategoryEncoders};
use super::scaler::{ScalerParams, StandardScaler};
use crate::dataset::{FeatureKind, FeatureSpec, FieldValue};
use crate::error::{ChurnError, Result};

/// Builds a [`CodecState`] from training rows
#[derive(Debug, Clone)]
pub struct FeatureCodec {
    spec: FeatureSpec,
}

impl FeatureCodec {
    pub fn new(spec: FeatureSpec) -> Self {
        Self { spec }
    }

    /// Fit encoders and scaler parameters.
    ///
    /// Rows hold values in feature-spec order. Only the rows passed here are
    /// observed, so callers pass the training partition.
    pub fn fit<R: AsRef<[FieldValue]>>(&self, rows: &[R]) -> Result<CodecState> {
        if rows.is_empty() {
            return Err(ChurnError::InvalidInput(
                "cannot fit feature codec on zero rows".to_string(),
            ));
        }
        let width = self.spec.len();
        if let Some(bad) = rows.iter().find(|r| r.as_ref().len() != width) {
            return Err(ChurnError::ShapeError {
                expected: format!("{} values per row", width),
                actual: format!("{} values", bad.as_ref().len()),
            });
        }

        let mut encoders = CategoryEncoders::new();
        let mut scaler = StandardScaler::new();

        for (j, def) in self.spec.features().iter().enumerate() {
            match def.kind {
                FeatureKind::Categorical => {
                    let values: Vec<String> = rows.iter().map(|r| r.as_ref()[j].as_category()).collect();
                    let encoder = CategoryEncoder::fit(&def.name, values.iter().map(String::as_str))?;
                    debug!(feature = %def.name, classes = encoder.len(), "Fitted category encoder");
                    encoders.insert(def.name.clone(), encoder);
                }
                FeatureKind::Numeric if def.standardize => {
                    let values = rows
                        .iter()
                        .map(|r| numeric_value(&def.name, &r.as_ref()[j]))
                        .collect::<Result<Vec<f64>>>()?;
                    let params = ScalerParams::fit(&values);
                    debug!(feature = %def.name, mean = params.mean, std = params.std, "Fitted scaler");
                    scaler.insert(def.name.clone(), params);
                }
                FeatureKind::Numeric => {}
            }
        }

        Ok(CodecState {
            spec: self.spec.clone(),
            encoders,
            scaler,
        })
    }
}

fn numeric_value(feature: &str, value: &FieldValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| ChurnError::InvalidValue {
        feature: feature.to_string(),
        value: value.to_string(),
    })
}

/// Frozen encoding tables and scaler parameters.
///
/// There is no way to refit a `CodecState`; a new one comes only from
/// [`FeatureCodec::fit`] or from reassembling persisted parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecState {
    spec: FeatureSpec,
    encoders: CategoryEncoders,
    scaler: StandardScaler,
}

impl CodecState {
    /// Reassemble from persisted parts, checking that they describe the same features
    pub fn from_parts(spec: FeatureSpec, encoders: CategoryEncoders, scaler: StandardScaler) -> Result<Self> {
        for def in spec.features() {
            match def.kind {
                FeatureKind::Categorical => {
                    let ok = encoders.get(&def.name).map_or(false, CategoryEncoder::is_consistent);
                    if !ok {
                        return Err(ChurnError::corrupt(
                            "encoders",
                            format!("no valid encoder for categorical feature '{}'", def.name),
                        ));
                    }
                }
                FeatureKind::Numeric if def.standardize => {
                    let ok = scaler
                        .get(&def.name)
                        .map_or(false, |p| p.mean.is_finite() && p.std.is_finite() && p.std >= 0.0);
                    if !ok {
                        return Err(ChurnError::corrupt(
                            "scaler",
                            format!("no valid scaler parameters for numeric feature '{}'", def.name),
                        ));
                    }
                }
                FeatureKind::Numeric => {}
            }
        }

        if let Some(extra) = encoders.features().find(|f| spec.position(f).is_none()) {
            return Err(ChurnError::corrupt("encoders", format!("encoder for unknown feature '{}'", extra)));
        }
        if let Some(extra) = scaler.features().find(|f| spec.position(f).is_none()) {
            return Err(ChurnError::corrupt("scaler", format!("parameters for unknown feature '{}'", extra)));
        }

        Ok(Self { spec, encoders, scaler })
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn encoders(&self) -> &CategoryEncoders {
        &self.encoders
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Encode one value of the feature at position `idx`
    pub fn encode_value(&self, idx: usize, value: &FieldValue) -> Result<f64> {
        let def = self.spec.features().get(idx).ok_or_else(|| {
            ChurnError::InvalidInput(format!("feature index {} out of range", idx))
        })?;

        match def.kind {
            FeatureKind::Categorical => {
                let encoder = self
                    .encoders
                    .get(&def.name)
                    .ok_or(ChurnError::ModelNotFitted)?;
                encoder
                    .encode(&def.name, &value.as_category())
                    .map(|code| code as f64)
            }
            FeatureKind::Numeric => {
                let v = numeric_value(&def.name, value)?;
                match self.scaler.get(&def.name) {
                    Some(params) if def.standardize => Ok(params.transform(v)),
                    None if def.standardize => Err(ChurnError::ModelNotFitted),
                    _ => Ok(v),
                }
            }
        }
    }

    /// Encode one row given in feature-spec order
    pub fn transform_row(&self, values: &[FieldValue]) -> Result<Vec<f64>> {
        if values.len() != self.spec.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} values per row", self.spec.len()),
                actual: format!("{} values", values.len()),
            });
        }
        values
            .iter()
            .enumerate()
            .map(|(j, v)| self.encode_value(j, v))
            .collect()
    }

    /// Encode rows into a `(n_rows, n_features)` matrix
    pub fn transform<R: AsRef<[FieldValue]>>(&self, rows: &[R]) -> Result<Array2<f64>> {
        let width = self.spec.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            flat.extend(self.transform_row(row.as_ref())?);
        }
        Ok(Array2::from_shape_vec((rows.len(), width), flat)?)
    }
}
