//! Label derivation, cleaning, stratified split and encoding

use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use super::loader::{column_names, numeric_column, text_column, DatasetLoader};
use super::schema::{self, ChurnIndicator, FeatureKind, FeatureSpec, LabelPolarity, ID_COLUMN};
use super::{CustomerRow, FieldValue};
use crate::config::PipelineConfig;
use crate::error::{ChurnError, Result};
use crate::preprocessing::{CodecState, FeatureCodec};

/// A raw row after label derivation; any cell may still be missing
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub customer_id: Option<String>,
    pub values: Vec<Option<FieldValue>>,
    pub churned: Option<bool>,
}

/// Rows with a derived label
#[derive(Debug, Clone)]
pub struct LabeledTable {
    pub rows: Vec<LabeledRow>,
    pub indicator: ChurnIndicator,
}

/// Complete rows only
#[derive(Debug, Clone)]
pub struct CleanTable {
    pub rows: Vec<CustomerRow>,
    pub dropped: usize,
    pub indicator: ChurnIndicator,
}

impl CleanTable {
    pub fn churn_count(&self) -> usize {
        self.rows.iter().filter(|r| r.churned).count()
    }
}

/// Stratified partition; indices refer to positions in the clean table
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<CustomerRow>,
    pub holdout: Vec<CustomerRow>,
    pub train_indices: Vec<usize>,
    pub holdout_indices: Vec<usize>,
}

/// Sizes and class balance of a prepared dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    pub usable_rows: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Holdout rows left out because they carry a category unseen in training
    pub holdout_excluded: usize,
    pub churn_rate: f64,
    pub train_churn_rate: f64,
    pub test_churn_rate: f64,
    pub label_source: String,
    pub label_inverted: bool,
}

/// Encoded train/holdout matrices with the codec that produced them
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub codec: CodecState,
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    pub test_customer_ids: Vec<String>,
    pub summary: DatasetSummary,
}

/// Turns a raw customer table into model-ready partitions
#[derive(Debug, Clone)]
pub struct DatasetPreparer {
    spec: FeatureSpec,
    loader: DatasetLoader,
    test_fraction: f64,
    random_state: u64,
    min_rows: usize,
}

impl Default for DatasetPreparer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl DatasetPreparer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            spec: FeatureSpec::churn_default(),
            loader: match config.delimiter {
                Some(d) => DatasetLoader::new().with_delimiter(d as u8),
                None => DatasetLoader::new(),
            },
            test_fraction: config.test_fraction,
            random_state: config.random_state,
            min_rows: config.min_rows,
        }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    /// Read a delimited file and check its header
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let df = self.loader.load_csv(path)?;
        self.validate_schema(&df)?;
        Ok(df)
    }

    /// Check that every required column is present
    pub fn validate_schema(&self, df: &DataFrame) -> Result<ChurnIndicator> {
        schema::validate_columns(&column_names(df))
    }

    /// Select the label source and derive the churn flag per row
    pub fn derive_label(&self, df: &DataFrame) -> Result<LabeledTable> {
        let indicator = self.validate_schema(df)?;
        let n = df.height();

        let ids = text_column(df, ID_COLUMN)?;
        let flags = text_column(df, indicator.column)?;

        let mut columns: Vec<Vec<Option<FieldValue>>> = Vec::with_capacity(self.spec.len());
        for def in self.spec.features() {
            let values = match def.kind {
                FeatureKind::Numeric => numeric_column(df, &def.name)?
                    .into_iter()
                    .map(|v| v.map(FieldValue::Number))
                    .collect(),
                FeatureKind::Categorical => text_column(df, &def.name)?
                    .into_iter()
                    .map(|v| v.map(FieldValue::Text))
                    .collect(),
            };
            columns.push(values);
        }

        let rows = (0..n)
            .map(|i| LabeledRow {
                customer_id: ids[i].clone(),
                values: columns.iter().map(|c| c[i].clone()).collect(),
                churned: flags[i].as_deref().and_then(parse_flag).map(|flag| match indicator.polarity {
                    LabelPolarity::Churned => flag,
                    LabelPolarity::Active => !flag,
                }),
            })
            .collect();

        info!(
            column = indicator.column,
            inverted = indicator.polarity == LabelPolarity::Active,
            "Derived churn label"
        );

        Ok(LabeledTable { rows, indicator })
    }

    /// Drop rows with a missing id, feature or label; no imputation
    pub fn clean(&self, table: LabeledTable) -> CleanTable {
        let total = table.rows.len();
        let rows: Vec<CustomerRow> = table
            .rows
            .into_iter()
            .filter_map(|row| {
                let customer_id = row.customer_id?;
                let churned = row.churned?;
                let values = row.values.into_iter().collect::<Option<Vec<FieldValue>>>()?;
                Some(CustomerRow { customer_id, values, churned })
            })
            .collect();

        let dropped = total - rows.len();
        if dropped > 0 {
            warn!(dropped, total, "Dropped incomplete rows");
        }

        CleanTable { rows, dropped, indicator: table.indicator }
    }

    /// Reject tables too small or with a single class
    pub fn check_quality(&self, table: &CleanTable) -> Result<()> {
        let n = table.rows.len();
        if n < self.min_rows {
            return Err(ChurnError::DataQuality(format!(
                "{} usable rows after cleaning, at least {} required",
                n, self.min_rows
            )));
        }
        let churned = table.churn_count();
        if churned == 0 || churned == n {
            return Err(ChurnError::DataQuality(format!(
                "label '{}' has a single class ({} of {} rows churned)",
                table.indicator.column, churned, n
            )));
        }
        Ok(())
    }

    /// Stratified split preserving the churn ratio in both partitions.
    ///
    /// Each class is shuffled with the seeded generator and
    /// `round(n_class * test_fraction)` rows are withheld (at least one and at
    /// most `n_class - 1` when the class has two or more rows).
    pub fn split(&self, rows: &[CustomerRow], test_fraction: f64, seed: u64) -> Result<DatasetSplit> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(ChurnError::invalid_parameter(
                "test_fraction",
                test_fraction,
                "must be strictly between 0 and 1",
            ));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut train_indices = Vec::new();
        let mut holdout_indices = Vec::new();

        for class in [false, true] {
            let mut indices: Vec<usize> = rows
                .iter()
                .enumerate()
                .filter(|(_, r)| r.churned == class)
                .map(|(i, _)| i)
                .collect();
            indices.shuffle(&mut rng);

            let n = indices.len();
            let n_test = if n >= 2 {
                ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1)
            } else {
                0
            };
            holdout_indices.extend_from_slice(&indices[..n_test]);
            train_indices.extend_from_slice(&indices[n_test..]);
        }

        if train_indices.is_empty() || holdout_indices.is_empty() {
            return Err(ChurnError::DataQuality(format!(
                "split of {} rows left an empty partition",
                rows.len()
            )));
        }

        train_indices.sort_unstable();
        holdout_indices.sort_unstable();

        let pick = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect::<Vec<_>>();
        Ok(DatasetSplit {
            train: pick(&train_indices),
            holdout: pick(&holdout_indices),
            train_indices,
            holdout_indices,
        })
    }

    /// Load, clean, split and encode a dataset file
    pub fn prepare(&self, path: impl AsRef<Path>) -> Result<PreparedDataset> {
        let df = self.load(path)?;
        self.prepare_frame(&df)
    }

    /// Clean, split and encode an in-memory table.
    ///
    /// The codec is fitted on the training partition only.
    pub fn prepare_frame(&self, df: &DataFrame) -> Result<PreparedDataset> {
        let labeled = self.derive_label(df)?;
        let rows_loaded = labeled.rows.len();
        let clean = self.clean(labeled);
        self.check_quality(&clean)?;

        let split = self.split(&clean.rows, self.test_fraction, self.random_state)?;
        info!(
            train = split.train.len(),
            holdout = split.holdout.len(),
            seed = self.random_state,
            "Stratified split"
        );

        let codec = FeatureCodec::new(self.spec.clone()).fit(&split.train)?;
        let x_train = codec.transform(&split.train)?;
        let y_train: Array1<f64> = split.train.iter().map(CustomerRow::label).collect();

        let mut test_values = Vec::with_capacity(split.holdout.len() * self.spec.len());
        let mut y_test = Vec::with_capacity(split.holdout.len());
        let mut test_customer_ids = Vec::with_capacity(split.holdout.len());
        let mut holdout_excluded = 0usize;

        for row in &split.holdout {
            match codec.transform_row(&row.values) {
                Ok(encoded) => {
                    test_values.extend(encoded);
                    y_test.push(row.label());
                    test_customer_ids.push(row.customer_id.clone());
                }
                Err(ChurnError::UnseenCategory { feature, value }) => {
                    debug!(customer = %row.customer_id, %feature, %value, "Holdout row has unseen category");
                    holdout_excluded += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if holdout_excluded > 0 {
            warn!(holdout_excluded, "Excluded holdout rows with categories unseen in training");
        }
        if y_test.is_empty() {
            return Err(ChurnError::DataQuality(
                "no holdout row can be encoded with the training codec".to_string(),
            ));
        }

        let x_test = Array2::from_shape_vec((y_test.len(), self.spec.len()), test_values)?;
        let y_test = Array1::from_vec(y_test);

        let usable_rows = clean.rows.len();
        let summary = DatasetSummary {
            rows_loaded,
            rows_dropped: clean.dropped,
            usable_rows,
            train_size: y_train.len(),
            test_size: y_test.len(),
            holdout_excluded,
            churn_rate: clean.churn_count() as f64 / usable_rows as f64,
            train_churn_rate: y_train.mean().unwrap_or(0.0),
            test_churn_rate: y_test.mean().unwrap_or(0.0),
            label_source: clean.indicator.column.to_string(),
            label_inverted: clean.indicator.polarity == LabelPolarity::Active,
        };

        Ok(PreparedDataset {
            codec,
            x_train,
            y_train,
            x_test,
            y_test,
            test_customer_ids,
            summary,
        })
    }
}

/// Parse a 0/1-style flag cell
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "si" | "sí" => Some(true),
        "0" | "0.0" | "false" | "no" => Some(false),
        _ => None,
    }
}
