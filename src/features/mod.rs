//! Transaction feature vectors and the ordered schema they are scored against.
//!
//! The scaler learns positional statistics, so the column order here is part of
//! the model contract: `[Time, V1..V28, Amount]`.

mod schema;

pub use schema::{FeatureSchema, FEATURE_NAMES, LABEL_COLUMN, SCHEMA_VERSION};

use crate::error::{FraudError, FraudResult};
use serde::{Deserialize, Serialize};

/// Number of features per transaction.
pub const FEATURE_COUNT: usize = 30;

/// Fixed-size, fixed-order feature vector for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build from a slice, rejecting wrong arity and non-finite values.
    pub fn from_slice(values: &[f64]) -> FraudResult<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(FraudError::InvalidInput(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                values.len()
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(FraudError::InvalidInput(format!(
                "feature {} ({}) is not a finite number",
                pos, FEATURE_NAMES[pos]
            )));
        }
        let mut out = [0.0; FEATURE_COUNT];
        out.copy_from_slice(values);
        Ok(Self { values: out })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}

/// Binary fraud label (`Class` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Legit,
    Fraud,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Legit => 0,
            Label::Fraud => 1,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Label::Legit),
            1 => Some(Label::Fraud),
            _ => None,
        }
    }
}

/// One labeled transaction. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub features: FeatureVector,
    pub label: Label,
}

impl LabeledRecord {
    pub fn new(features: FeatureVector, label: Label) -> Self {
        Self { features, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_arity() {
        let err = FeatureVector::from_slice(&[0.0; 29]).unwrap_err();
        assert!(matches!(err, FraudError::InvalidInput(_)));
        let err = FeatureVector::from_slice(&[0.0; 31]).unwrap_err();
        assert!(matches!(err, FraudError::InvalidInput(_)));
    }

    #[test]
    fn rejects_non_finite() {
        let mut raw = [1.0; FEATURE_COUNT];
        raw[29] = f64::NAN;
        assert!(FeatureVector::from_slice(&raw).is_err());
        raw[29] = f64::INFINITY;
        assert!(FeatureVector::from_slice(&raw).is_err());
    }

    #[test]
    fn named_access_follows_schema_order() {
        let raw: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64).collect();
        let fv = FeatureVector::from_slice(&raw).unwrap();
        assert_eq!(fv.get("Time"), Some(0.0));
        assert_eq!(fv.get("V1"), Some(1.0));
        assert_eq!(fv.get("V28"), Some(28.0));
        assert_eq!(fv.get("Amount"), Some(29.0));
        assert_eq!(fv.get("Class"), None);
    }
}
