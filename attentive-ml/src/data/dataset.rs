//! In-memory tabular dataset: named feature columns plus a binary label.

use crate::error::{MlError, ensure_width};
use ndarray::{Array1, Array2, Axis};
use std::path::Path;

/// Feature matrix (rows = samples) with an aligned 0/1 label vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

impl Dataset {
    /// Build a dataset, checking row alignment, column naming, finite feature
    /// values and label values.
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        labels: Array1<f64>,
    ) -> Result<Self, MlError> {
        ensure_width("dataset label rows", features.nrows(), labels.len())?;
        ensure_width("dataset feature names", features.ncols(), feature_names.len())?;
        if let Some(((row, col), value)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MlError::dataset(format!(
                "feature '{}' at row {row} is {value}, expected a finite number",
                feature_names[col]
            )));
        }
        if let Some((row, value)) = labels
            .iter()
            .enumerate()
            .find(|(_, v)| **v != 0.0 && **v != 1.0)
        {
            return Err(MlError::dataset(format!(
                "label at row {row} is {value}, expected 0 or 1"
            )));
        }
        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    /// Load a CSV file with a header row. Every cell must parse as a number.
    pub fn from_csv(path: &Path, label_column: &str, delimiter: char) -> Result<Self, MlError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_csv(&content, label_column, delimiter)
    }

    pub fn parse_csv(content: &str, label_column: &str, delimiter: char) -> Result<Self, MlError> {
        let mut lines = content.lines();

        let columns: Vec<String> = lines
            .next()
            .ok_or_else(|| MlError::dataset("Empty CSV file"))?
            .split(delimiter)
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();
        let label_idx = columns
            .iter()
            .position(|c| c == label_column)
            .ok_or_else(|| MlError::dataset(format!("label column '{label_column}' not found")))?;
        let feature_names: Vec<String> = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx)
            .map(|(_, c)| c.clone())
            .collect();

        let mut values = Vec::new();
        let mut labels = Vec::new();
        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split(delimiter).collect();
            if cells.len() != columns.len() {
                return Err(MlError::dataset(format!(
                    "line {}: expected {} fields, found {}",
                    line_no + 2,
                    columns.len(),
                    cells.len()
                )));
            }
            for (i, cell) in cells.iter().enumerate() {
                let cell = cell.trim().trim_matches('"');
                let value: f64 = cell.parse().map_err(|_| {
                    MlError::dataset(format!(
                        "line {}: column '{}' is not numeric: '{cell}'",
                        line_no + 2,
                        columns[i]
                    ))
                })?;
                if i == label_idx {
                    labels.push(value);
                } else {
                    values.push(value);
                }
            }
        }

        if labels.is_empty() {
            return Err(MlError::dataset("CSV file has no data rows"));
        }
        let features = Array2::from_shape_vec((labels.len(), feature_names.len()), values)
            .map_err(|e| MlError::dataset(format!("failed to assemble feature matrix: {e}")))?;
        Self::new(feature_names, features, Array1::from(labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn width(&self) -> usize {
        self.features.ncols()
    }

    /// Rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }

    /// Same labels and names, different feature values of identical shape.
    pub fn with_features(&self, features: Array2<f64>) -> Result<Self, MlError> {
        Self::new(self.feature_names.clone(), features, self.labels.clone())
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|v| **v == 1.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const SAMPLE: &str = "q1,q2,is_adhd,q3\n1,2,0,3\n4,5,1,6\n\n7,8,1,9\n";

    #[test]
    fn test_parse_csv_moves_label_out() {
        let ds = Dataset::parse_csv(SAMPLE, "is_adhd", ',').unwrap();
        assert_eq!(ds.feature_names, vec!["q1", "q2", "q3"]);
        assert_eq!(ds.features, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        assert_eq!(ds.labels, array![0.0, 1.0, 1.0]);
        assert_eq!(ds.positive_count(), 2);
    }

    #[test]
    fn test_parse_csv_missing_label_column() {
        let err = Dataset::parse_csv("a,b\n1,2\n", "is_adhd", ',').unwrap_err();
        assert!(err.to_string().contains("is_adhd"));
    }

    #[test]
    fn test_parse_csv_rejects_ragged_and_text() {
        assert!(Dataset::parse_csv("a,y\n1\n", "y", ',').is_err());
        let err = Dataset::parse_csv("a,y\nabc,1\n", "y", ',').unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let err = Dataset::parse_csv("a,y\n1,2\n", "y", ',').unwrap_err();
        assert!(matches!(err, MlError::Dataset(_)));
    }

    #[test]
    fn test_non_finite_feature_rejected() {
        let err = Dataset::parse_csv("a,b,y\n1,2,1\n3,NaN,0\n", "y", ',').unwrap_err();
        assert!(matches!(err, MlError::Dataset(_)));
        let msg = err.to_string();
        assert!(msg.contains("'b'") && msg.contains("row 1"), "{msg}");

        assert!(Dataset::parse_csv("a,y\ninf,0\n1,1\n", "y", ',').is_err());
        let err = Dataset::new(
            vec!["a".into()],
            array![[1.0], [f64::NEG_INFINITY]],
            array![0.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(err, MlError::Dataset(_)));
    }

    #[test]
    fn test_misaligned_rows_is_shape_mismatch() {
        let err = Dataset::new(vec!["a".into()], Array2::zeros((3, 1)), Array1::zeros(2)).unwrap_err();
        assert!(matches!(err, MlError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_select_keeps_alignment() {
        let ds = Dataset::parse_csv(SAMPLE, "is_adhd", ',').unwrap();
        let sub = ds.select(&[2, 0]);
        assert_eq!(sub.features.row(0).to_vec(), vec![7.0, 8.0, 9.0]);
        assert_eq!(sub.labels.to_vec(), vec![1.0, 0.0]);
    }
}
