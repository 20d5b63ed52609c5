//! Training-only imbalance correction.
//!
//! SMOTE synthesises minority rows by interpolating between a minority example
//! and one of its k nearest minority neighbours until both classes are the same
//! size. It runs on the scaled training set inside `fit` and nowhere else.

use crate::error::{FraudError, FraudResult};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// A resampling stage applied to the training set before the classifier is fit.
pub trait ImbalanceCorrection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return a rebalanced copy of `(x, y)`; labels are 0/1.
    fn resample(&self, x: &Array2<f64>, y: &[u8]) -> FraudResult<(Array2<f64>, Vec<u8>)>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoteConfig {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Default for SmoteConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Smote {
    config: SmoteConfig,
}

impl Smote {
    pub fn new(config: SmoteConfig) -> Self {
        Self { config }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl ImbalanceCorrection for Smote {
    fn name(&self) -> &'static str {
        "smote"
    }

    fn resample(&self, x: &Array2<f64>, y: &[u8]) -> FraudResult<(Array2<f64>, Vec<u8>)> {
        if x.nrows() != y.len() {
            return Err(FraudError::Schema(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        let positives = y.iter().filter(|&&l| l == 1).count();
        let negatives = y.len() - positives;
        if positives == 0 || negatives == 0 {
            return Err(FraudError::InsufficientData(
                "imbalance correction needs both classes in the training set".into(),
            ));
        }
        if positives == negatives {
            return Ok((x.clone(), y.to_vec()));
        }

        let (minority_label, n_synthetic) = if positives < negatives {
            (1u8, negatives - positives)
        } else {
            (0u8, positives - negatives)
        };
        let n_features = x.ncols();
        let data: Vec<f64> = x.iter().copied().collect();
        let row = |i: usize| &data[i * n_features..(i + 1) * n_features];

        let minority: Vec<usize> = (0..y.len()).filter(|&i| y[i] == minority_label).collect();
        if minority.len() < 2 {
            return Err(FraudError::InsufficientData(format!(
                "minority class has {} example(s); need at least 2 to interpolate",
                minority.len()
            )));
        }
        let k = self.config.k_neighbors.min(minority.len() - 1).max(1);

        let neighbours: Vec<Vec<usize>> = minority
            .iter()
            .map(|&i| {
                let mut dists: Vec<(f64, usize)> = minority
                    .iter()
                    .filter(|&&j| j != i)
                    .map(|&j| (squared_distance(row(i), row(j)), j))
                    .collect();
                dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
                dists.into_iter().take(k).map(|(_, j)| j).collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut out = data.clone();
        out.reserve(n_synthetic * n_features);
        for _ in 0..n_synthetic {
            let pick = rng.gen_range(0..minority.len());
            let base = row(minority[pick]);
            let other = row(neighbours[pick][rng.gen_range(0..k)]);
            let gap: f64 = rng.gen();
            out.extend(base.iter().zip(other).map(|(a, b)| a + gap * (b - a)));
        }
        let mut labels = y.to_vec();
        labels.extend(std::iter::repeat(minority_label).take(n_synthetic));

        debug!(
            minority = minority.len(),
            synthetic = n_synthetic,
            k,
            "smote resampled training set"
        );
        let x_out = Array2::from_shape_vec((labels.len(), n_features), out)
            .map_err(|e| FraudError::Schema(e.to_string()))?;
        Ok((x_out, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn balances_classes_with_interpolated_rows() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [0.2, 0.2],
            [0.1, 0.1],
            [5.0, 5.0],
            [6.0, 6.0],
        ];
        let y = vec![0, 0, 0, 0, 0, 1, 1];
        let smote = Smote::new(SmoteConfig { k_neighbors: 5, seed: 7 });
        let (xr, yr) = smote.resample(&x, &y).unwrap();
        assert_eq!(yr.iter().filter(|&&l| l == 1).count(), 5);
        assert_eq!(yr.iter().filter(|&&l| l == 0).count(), 5);
        assert_eq!(xr.nrows(), 10);
        // Synthetic rows lie on the segment between the two minority points.
        for r in 7..10 {
            let a = xr[[r, 0]];
            assert!((5.0..=6.0).contains(&a));
            assert_eq!(xr[[r, 0]], xr[[r, 1]]);
        }
        // Originals are kept untouched at the front.
        assert_eq!(xr.row(5).to_vec(), vec![5.0, 5.0]);
    }

    #[test]
    fn same_seed_same_output() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0], [12.5]];
        let y = vec![0, 0, 0, 0, 1, 1, 1];
        let smote = Smote::new(SmoteConfig::default());
        assert_eq!(smote.resample(&x, &y).unwrap(), smote.resample(&x, &y).unwrap());
    }

    #[test]
    fn single_minority_example_is_rejected() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = vec![0, 0, 1];
        let err = Smote::new(SmoteConfig::default()).resample(&x, &y).unwrap_err();
        assert!(matches!(err, FraudError::InsufficientData(_)));
    }
}
