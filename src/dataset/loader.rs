//! Delimited file loading

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Loader for delimited customer tables
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    /// `None` picks tab for `.tsv` files and comma otherwise
    delimiter: Option<u8>,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Read a delimited file with a header row.
    ///
    /// Every row is scanned for schema inference.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ChurnError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let delimiter = self.delimiter.unwrap_or_else(|| match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        });

        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ChurnError::DataError(format!("cannot parse {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
        Ok(df)
    }
}

/// Column names of a frame as owned strings
pub(crate) fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Column values as optional strings; nulls and blank cells become `None`
pub(crate) fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::Schema { missing: vec![name.to_string()] })?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

/// Column values as optional finite floats; unparsable cells become `None`
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::Schema { missing: vec![name.to_string()] })?;
    let series = column.as_materialized_series();
    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()).filter(|x| x.is_finite()))
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect(),
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_and_read_columns() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "id,age,city").unwrap();
        writeln!(tmp.as_file(), "1,34,Lima").unwrap();
        writeln!(tmp.as_file(), "2,,Quito").unwrap();
        writeln!(tmp.as_file(), "3,51, ").unwrap();
        tmp.as_file().flush().unwrap();

        let df = DatasetLoader::new().load_csv(tmp.path()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(column_names(&df), vec!["id", "age", "city"]);

        let ages = numeric_column(&df, "age").unwrap();
        assert_eq!(ages, vec![Some(34.0), None, Some(51.0)]);

        let cities = text_column(&df, "city").unwrap();
        assert_eq!(cities[0].as_deref(), Some("Lima"));
        assert_eq!(cities[2], None);
    }

    #[test]
    fn test_delimiter_sniffed_or_explicit() {
        let tsv = tempfile::NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(tsv.as_file(), "id\tage").unwrap();
        writeln!(tsv.as_file(), "1\t34").unwrap();
        tsv.as_file().flush().unwrap();
        assert_eq!(column_names(&DatasetLoader::new().load_csv(tsv.path()).unwrap()), vec!["id", "age"]);

        let semi = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(semi.as_file(), "id;age").unwrap();
        writeln!(semi.as_file(), "1;34").unwrap();
        semi.as_file().flush().unwrap();
        let df = DatasetLoader::new().with_delimiter(b';').load_csv(semi.path()).unwrap();
        assert_eq!(column_names(&df), vec!["id", "age"]);
        assert_eq!(numeric_column(&df, "age").unwrap(), vec![Some(34.0)]);
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let err = DatasetLoader::new().load_csv("/nonexistent/customers.csv").unwrap_err();
        assert!(matches!(err, ChurnError::DataError(_)));
    }
}
