//! Versioned schema descriptor carried alongside every model artifact.

use super::FEATURE_COUNT;
use crate::error::{FraudError, FraudResult};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

pub const LABEL_COLUMN: &str = "Class";

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28", "Amount",
];

/// Ordered, named input fields a pipeline expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fields: Vec<String>,
    /// Name of the output column the classifier predicts.
    pub output: String,
}

impl FeatureSchema {
    pub fn canonical() -> Self {
        Self {
            version: SCHEMA_VERSION,
            fields: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            output: "is_fraud".to_string(),
        }
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Check a loaded schema against the constant arity and field order.
    pub fn validate(&self) -> FraudResult<()> {
        if self.version != SCHEMA_VERSION {
            return Err(FraudError::Schema(format!(
                "unsupported schema version {} (expected {})",
                self.version, SCHEMA_VERSION
            )));
        }
        if self.fields.len() != FEATURE_COUNT {
            return Err(FraudError::Schema(format!(
                "schema has {} fields, expected {}",
                self.fields.len(),
                FEATURE_COUNT
            )));
        }
        for (i, (got, want)) in self.fields.iter().zip(FEATURE_NAMES.iter()).enumerate() {
            if got != want {
                return Err(FraudError::Schema(format!(
                    "field {} is {:?}, expected {:?}",
                    i, got, want
                )));
            }
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_schema_validates() {
        let s = FeatureSchema::canonical();
        assert_eq!(s.arity(), 30);
        assert_eq!(s.fields.first().map(String::as_str), Some("Time"));
        assert_eq!(s.fields.last().map(String::as_str), Some("Amount"));
        s.validate().unwrap();
    }

    #[test]
    fn reordered_schema_is_rejected() {
        let mut s = FeatureSchema::canonical();
        s.fields.swap(1, 2);
        assert!(matches!(s.validate(), Err(FraudError::Schema(_))));
    }

    #[test]
    fn truncated_schema_is_rejected() {
        let mut s = FeatureSchema::canonical();
        s.fields.pop();
        assert!(matches!(s.validate(), Err(FraudError::Schema(_))));
    }
}
