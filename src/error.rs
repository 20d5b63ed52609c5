//! Error taxonomy shared by the offline pipeline, the registry and the scoring service.

use thiserror::Error;

pub type FraudResult<T> = Result<T, FraudError>;

#[derive(Debug, Error)]
pub enum FraudError {
    /// Missing or malformed label/feature columns.
    #[error("schema error: {0}")]
    Schema(String),

    /// Stratification or resampling is impossible with the data at hand.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("pipeline has not been fitted")]
    NotFitted,

    #[error("pipeline is already fitted and sealed")]
    AlreadyFitted,

    /// Evaluation labels contain a single class.
    #[error("degenerate evaluation: {0}")]
    DegenerateEvaluation(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Scoring attempted while no model is loaded.
    #[error("model not loaded")]
    ModelUnavailable,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Details are logged, not returned.
    #[error("internal scoring error")]
    InternalScoring,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl FraudError {
    /// Short, fixed label for the error kind. Safe to expose to callers.
    pub fn category(&self) -> &'static str {
        match self {
            FraudError::Schema(_) => "schema error",
            FraudError::InsufficientData(_) => "insufficient data",
            FraudError::NotFitted => "pipeline not fitted",
            FraudError::AlreadyFitted => "pipeline already fitted",
            FraudError::DegenerateEvaluation(_) => "degenerate evaluation",
            FraudError::ModelNotFound(_) => "model not found",
            FraudError::ModelUnavailable => "model not loaded",
            FraudError::InvalidInput(_) => "invalid input",
            FraudError::InternalScoring => "internal scoring error",
            FraudError::Config(_) => "invalid configuration",
            FraudError::Registry(_) | FraudError::Sqlite(_) => "registry error",
            FraudError::Io(_) => "i/o error",
            FraudError::Json(_) | FraudError::Csv(_) => "decode error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_hides_detail() {
        let err = FraudError::ModelNotFound("models:/fraud@production".into());
        assert_eq!(err.category(), "model not found");
        let err = FraudError::Registry("checksum mismatch for fraud/3".into());
        assert_eq!(err.category(), "registry error");
        assert!(!err.category().contains("fraud"));
    }
}
