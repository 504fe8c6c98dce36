//! Per-column standardization fitted on training rows only.

use crate::error::{MlError, ensure_width};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Affine per-column transform `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl Standardizer {
    /// Fit column means and population standard deviations.
    ///
    /// Constant columns get a scale of 1.0 so they map to zero instead of NaN.
    pub fn fit(data: &Array2<f64>) -> Result<Self, MlError> {
        if data.nrows() == 0 {
            return Err(MlError::dataset("cannot fit a standardizer on zero rows"));
        }
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| MlError::dataset("cannot fit a standardizer on zero rows"))?;
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(Self { mean, scale })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        ensure_width("standardizer input width", self.width(), data.ncols())?;
        Ok((data - &self.mean) / &self.scale)
    }

    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        ensure_width("standardizer input width", self.width(), data.ncols())?;
        Ok(data * &self.scale + &self.mean)
    }

    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>, MlError> {
        ensure_width("standardizer input width", self.width(), row.len())?;
        Ok((&row - &self.mean) / &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean_unit_scale() {
        let data = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let s = Standardizer::fit(&data).unwrap();
        assert_eq!(s.mean, array![3.0, 10.0]);
        assert_eq!(s.scale[1], 1.0);
        let z = s.transform(&data).unwrap();
        let col_mean = z.mean_axis(Axis(0)).unwrap();
        assert!(col_mean.iter().all(|m| m.abs() < 1e-12));
        assert!((z.std_axis(Axis(0), 0.0)[0] - 1.0).abs() < 1e-12);
        assert!(z.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let data = array![[0.5, -2.0, 7.0], [1.5, 4.0, 7.5], [-3.0, 0.0, 9.0]];
        let s = Standardizer::fit(&data).unwrap();
        let back = s.inverse_transform(&s.transform(&data).unwrap()).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_width_mismatch() {
        let s = Standardizer::fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            s.transform(&array![[1.0, 2.0, 3.0]]),
            Err(MlError::ShapeMismatch { expected: 2, actual: 3, .. })
        ));
        assert!(s.transform_row(array![1.0].view()).is_err());
    }
}
