//! Data loading and inner join of the two tabular sources using Polars

use crate::error::SeedError;
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

const KEY_COLUMN: &str = "key";

/// Joined, key-sorted feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Join key of each row, strictly ascending
    pub keys: Vec<i64>,
    /// Features as ndarray (n_points, d): source-1 columns, then source-2 columns
    pub features: Array2<f64>,
}

impl FeatureMatrix {
    /// Number of points, i.e. rows that survived the join
    pub fn n_points(&self) -> usize {
        self.keys.len()
    }

    pub fn dim(&self) -> usize {
        self.features.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A source normalized to a `key` column plus uniquely named Float64 features.
#[derive(Debug)]
pub struct Source {
    frame: DataFrame,
    feature_names: Vec<String>,
}

/// Load both sources and inner-join them on their first column
///
/// # Arguments
/// * `path_1` - Headerless comma-delimited file whose features come first
/// * `path_2` - Headerless comma-delimited file whose features come second
///
/// # Returns
/// * `FeatureMatrix` holding only keys present in both sources, sorted ascending
pub fn load_and_join(path_1: &Path, path_2: &Path) -> crate::Result<FeatureMatrix> {
    let left = load_source(path_1, "left_")?;
    let right = load_source(path_2, "right_")?;
    join_sources(left, right)
}

/// Read one headerless source. `.txt` and `.csv` files share the same reader.
///
/// Rows the reader cannot fit into one schema (ragged field counts, say) are
/// `MalformedInput`; I/O failures stay `Read`.
pub fn load_source(path: &Path, prefix: &str) -> crate::Result<Source> {
    let frame = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|source| match source {
            PolarsError::ComputeError(_)
            | PolarsError::SchemaMismatch(_)
            | PolarsError::ShapeMismatch(_) => SeedError::malformed(path, source.to_string()),
            source => SeedError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

    info!(path = %path.display(), rows = frame.height(), columns = frame.width(), "loaded source");
    normalize_source(&frame, prefix, path)
}

/// Validate a raw frame and rename its columns so two sources can be joined.
pub fn normalize_source(frame: &DataFrame, prefix: &str, path: &Path) -> crate::Result<Source> {
    let Some((key_column, feature_columns)) = frame.get_columns().split_first() else {
        return Err(SeedError::malformed(path, "source has no columns"));
    };
    if feature_columns.is_empty() {
        return Err(SeedError::malformed(path, "source has no feature columns"));
    }

    let keys = parse_keys(key_column).map_err(|reason| SeedError::malformed(path, reason))?;
    let mut seen = HashSet::with_capacity(keys.len());
    if let Some(duplicate) = keys.iter().find(|&&key| !seen.insert(key)) {
        return Err(SeedError::malformed(path, format!("duplicate key {duplicate}")));
    }

    let mut columns = Vec::with_capacity(frame.width());
    let mut feature_names = Vec::with_capacity(feature_columns.len());
    columns.push(Series::new(KEY_COLUMN, keys));

    for (i, column) in feature_columns.iter().enumerate() {
        let values = parse_features(column).map_err(|reason| {
            SeedError::malformed(path, format!("feature column {}: {reason}", i + 1))
        })?;
        let name = format!("{prefix}{i}");
        columns.push(Series::new(&name, values));
        feature_names.push(name);
    }

    Ok(Source {
        frame: DataFrame::new(columns)?,
        feature_names,
    })
}

/// Inner join on the key column, then sort by ascending key
pub fn join_sources(left: Source, right: Source) -> crate::Result<FeatureMatrix> {
    let feature_names: Vec<String> = left
        .feature_names
        .into_iter()
        .chain(right.feature_names)
        .collect();

    let joined = left
        .frame
        .lazy()
        .inner_join(right.frame.lazy(), col(KEY_COLUMN), col(KEY_COLUMN))
        .sort([KEY_COLUMN], SortMultipleOptions::default())
        .collect()?;

    let keys: Vec<i64> = joined
        .column(KEY_COLUMN)?
        .i64()?
        .into_no_null_iter()
        .collect();

    let columns = feature_names
        .iter()
        .map(|name| -> crate::Result<Vec<f64>> {
            Ok(joined.column(name)?.f64()?.into_no_null_iter().collect())
        })
        .collect::<crate::Result<Vec<_>>>()?;

    let features = Array2::from_shape_fn((keys.len(), columns.len()), |(i, j)| columns[j][i]);

    info!(rows = keys.len(), dim = features.ncols(), "joined sources");
    debug!(?keys, "joined keys");

    Ok(FeatureMatrix { keys, features })
}

/// Cells padded with whitespace (`1, 2.5`) are read as strings. Parse those
/// after trimming; any other non-numeric column is rejected.
fn numeric_column(column: &Series) -> std::result::Result<Series, String> {
    let dtype = column.dtype();
    if dtype.is_numeric() {
        return Ok(column.clone());
    }
    if dtype != &DataType::String {
        return Err(format!("non-numeric {dtype} values"));
    }

    let cells = column.str().map_err(|e| e.to_string())?;
    let values = cells
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Some(cell) => cell
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("row {}: non-numeric value {cell:?}", row + 1)),
            None => Ok(None),
        })
        .collect::<std::result::Result<Vec<Option<f64>>, String>>()?;

    Ok(Series::new(column.name(), values))
}

/// Keys must be integers; integral floats such as `3.0` are accepted.
fn parse_keys(column: &Series) -> std::result::Result<Vec<i64>, String> {
    let column = numeric_column(column).map_err(|reason| format!("key column: {reason}"))?;
    let dtype = column.dtype();

    if dtype.is_integer() {
        let cast = column.cast(&DataType::Int64).map_err(|e| e.to_string())?;
        let keys = cast.i64().map_err(|e| e.to_string())?;
        return keys
            .into_iter()
            .enumerate()
            .map(|(row, key)| key.ok_or_else(|| format!("row {}: missing key", row + 1)))
            .collect();
    }

    let cast = column.cast(&DataType::Float64).map_err(|e| e.to_string())?;
    let keys = cast.f64().map_err(|e| e.to_string())?;
    keys.into_iter()
        .enumerate()
        .map(|(row, key)| match key {
            Some(key) if key.fract() == 0.0 && key.abs() < 9.0e15 => Ok(key as i64),
            Some(key) => Err(format!("row {}: key {key} is not an integer", row + 1)),
            None => Err(format!("row {}: missing key", row + 1)),
        })
        .collect()
}

fn parse_features(column: &Series) -> std::result::Result<Vec<f64>, String> {
    let column = numeric_column(column)?;
    let cast = column.cast(&DataType::Float64).map_err(|e| e.to_string())?;
    let values = cast.f64().map_err(|e| e.to_string())?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(value) if value.is_finite() => Ok(value),
            Some(value) => Err(format!("row {}: non-finite value {value}", row + 1)),
            None => Err(format!("row {}: missing value", row + 1)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_source(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    #[test]
    fn test_inner_join_keeps_shared_keys_sorted() {
        let a = write_source(&["5,0.5", "1,0.1", "3,0.3", "9,0.9"]);
        let b = write_source(&["3,30.0,300.0", "7,70.0,700.0", "1,10.0,100.0", "5,50.0,500.0"]);

        let matrix = load_and_join(a.path(), b.path()).unwrap();

        assert_eq!(matrix.keys, vec![1, 3, 5]);
        assert_eq!(matrix.features.shape(), &[3, 3]);
        assert_eq!(matrix.features.row(0).to_vec(), vec![0.1, 10.0, 100.0]);
        assert_eq!(matrix.features.row(1).to_vec(), vec![0.3, 30.0, 300.0]);
        assert_eq!(matrix.features.row(2).to_vec(), vec![0.5, 50.0, 500.0]);
    }

    #[test]
    fn test_join_example_from_two_single_feature_sources() {
        let a = write_source(&["1,0.0", "2,10.0", "3,20.0"]);
        let b = write_source(&["1,0.0", "2,0.0", "3,0.0"]);

        let matrix = load_and_join(a.path(), b.path()).unwrap();

        assert_eq!(matrix.n_points(), 3);
        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.features.column(0).to_vec(), vec![0.0, 10.0, 20.0]);
        assert_eq!(matrix.features.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_float_formatted_keys_are_accepted() {
        let a = write_source(&["2.0,1.5", "1.0,2.5"]);
        let b = write_source(&["1,7", "2,8"]);

        let matrix = load_and_join(a.path(), b.path()).unwrap();

        assert_eq!(matrix.keys, vec![1, 2]);
        assert_eq!(matrix.features.row(0).to_vec(), vec![2.5, 7.0]);
    }

    #[test]
    fn test_disjoint_keys_yield_empty_matrix() {
        let a = write_source(&["1,1.0", "2,2.0"]);
        let b = write_source(&["3,3.0", "4,4.0"]);

        let matrix = load_and_join(a.path(), b.path()).unwrap();

        assert!(matrix.is_empty());
        assert_eq!(matrix.features.shape(), &[0, 2]);
    }

    #[test]
    fn test_non_numeric_feature_is_malformed() {
        let a = write_source(&["1,abc", "2,2.0"]);
        let b = write_source(&["1,1.0", "2,2.0"]);

        let err = load_and_join(a.path(), b.path()).unwrap_err();
        assert!(matches!(err, SeedError::MalformedInput { .. }), "{err}");
    }

    #[test]
    fn test_fractional_key_is_malformed() {
        let a = write_source(&["1.5,1.0", "2,2.0"]);
        let b = write_source(&["1,1.0", "2,2.0"]);

        let err = load_and_join(a.path(), b.path()).unwrap_err();
        assert!(matches!(err, SeedError::MalformedInput { .. }), "{err}");
    }

    #[test]
    fn test_duplicate_key_is_malformed() {
        let a = write_source(&["1,1.0", "1,2.0"]);
        let b = write_source(&["1,1.0", "2,2.0"]);

        let err = load_and_join(a.path(), b.path()).unwrap_err();
        assert!(matches!(err, SeedError::MalformedInput { .. }), "{err}");
    }

    #[test]
    fn test_whitespace_padded_cells_are_trimmed() {
        let a = write_source(&["1, 1.0", "2, 2.0", "3, 3.0"]);
        let b = write_source(&["1,1.0", "2,2.0", "3,3.0"]);

        let matrix = load_and_join(a.path(), b.path()).unwrap();

        assert_eq!(matrix.keys, vec![1, 2, 3]);
        assert_eq!(matrix.features.column(0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(matrix.features.column(1).to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_whitespace_padded_keys_are_trimmed() {
        let a = write_source(&[" 2,5.0", " 1,4.0"]);
        let b = write_source(&["1,1.0", "2,2.0"]);

        let matrix = load_and_join(a.path(), b.path()).unwrap();

        assert_eq!(matrix.keys, vec![1, 2]);
        assert_eq!(matrix.features.row(0).to_vec(), vec![4.0, 1.0]);
    }

    #[test]
    fn test_padded_non_numeric_feature_is_malformed() {
        let a = write_source(&["1, 1.0", "2, abc"]);
        let b = write_source(&["1,1.0", "2,2.0"]);

        let err = load_and_join(a.path(), b.path()).unwrap_err();
        assert!(matches!(err, SeedError::MalformedInput { .. }), "{err}");
    }

    #[test]
    fn test_ragged_rows_are_malformed() {
        let a = write_source(&["1,1.0", "2,2.0,3.0", "3,3.0"]);
        let b = write_source(&["1,1.0", "2,2.0", "3,3.0"]);

        let err = load_and_join(a.path(), b.path()).unwrap_err();
        assert!(matches!(err, SeedError::MalformedInput { .. }), "{err}");
    }

    #[test]
    fn test_key_only_source_is_malformed() {
        let frame = DataFrame::new(vec![Series::new("column_1", vec![1i64, 2, 3])]).unwrap();

        let err = normalize_source(&frame, "left_", Path::new("keys.csv")).unwrap_err();
        assert!(matches!(err, SeedError::MalformedInput { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let a = write_source(&["1,1.0"]);

        let err = load_and_join(a.path(), Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
    }
}
