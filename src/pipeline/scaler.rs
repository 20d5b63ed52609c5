//! Column-wise standardisation learned from training features only.

use crate::error::{FraudError, FraudResult};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation per column. Constant columns get scale 1.
    pub fn fit(x: &Array2<f64>) -> FraudResult<Self> {
        if x.nrows() == 0 {
            return Err(FraudError::InsufficientData("cannot fit scaler on zero rows".into()));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| FraudError::InsufficientData("cannot fit scaler on zero rows".into()))?;
        let var = x.var_axis(Axis(0), 0.0);
        let scale = var
            .iter()
            .map(|v| {
                let s = v.sqrt();
                if s > 1e-12 && s.is_finite() {
                    s
                } else {
                    1.0
                }
            })
            .collect();
        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            for ((v, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *v = (*v - m) / s;
            }
        }
        out
    }

    /// Transform one row into `out`; both slices must have `n_features()` entries.
    pub fn transform_row(&self, row: &[f64], out: &mut [f64]) {
        for (((dst, v), m), s) in out.iter_mut().zip(row).zip(&self.mean).zip(&self.scale) {
            *dst = (v - m) / s;
        }
    }

    /// Pass-through scaler (mean 0, scale 1).
    pub fn identity(n_features: usize) -> Self {
        Self {
            mean: vec![0.0; n_features],
            scale: vec![1.0; n_features],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardises_columns() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let s = StandardScaler::fit(&x).unwrap();
        assert_eq!(s.mean(), &[3.0, 10.0]);
        // Constant column keeps scale 1 instead of dividing by zero.
        assert_eq!(s.scale()[1], 1.0);
        let t = s.transform(&x);
        assert!((t[[0, 0]] + 1.224744871391589).abs() < 1e-12);
        assert!((t[[2, 0]] - 1.224744871391589).abs() < 1e-12);
        assert_eq!(t[[1, 1]], 0.0);
    }

    #[test]
    fn row_transform_matches_matrix_transform() {
        let x = array![[1.0, -2.0], [2.0, 4.0], [9.0, 0.5]];
        let s = StandardScaler::fit(&x).unwrap();
        let t = s.transform(&x);
        let mut out = [0.0; 2];
        s.transform_row(&[9.0, 0.5], &mut out);
        assert_eq!(out[0], t[[2, 0]]);
        assert_eq!(out[1], t[[2, 1]]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(&x).is_err());
    }
}
