//! Training pipeline: scaler → imbalance correction → classifier.
//!
//! The pipeline is a tagged mode. While `Fitting` it owns the correction stage;
//! `fit` consumes that stage and seals the pipeline into `Scoring`, which only
//! holds the scaler and classifier. The scoring path therefore has no way to
//! reach imbalance correction.

pub mod boost;
pub mod metrics;
pub mod scaler;
pub mod smote;

pub use boost::{BoostParams, GradientBoostedTrees};
pub use metrics::EvaluationMetrics;
pub use scaler::StandardScaler;
pub use smote::{ImbalanceCorrection, Smote, SmoteConfig};

use crate::data::to_design_matrix;
use crate::error::{FraudError, FraudResult};
use crate::features::{FeatureSchema, FeatureVector, Label, LabeledRecord, FEATURE_COUNT};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Sealed scaler + classifier. This is what gets published and scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    schema: FeatureSchema,
    scaler: StandardScaler,
    classifier: GradientBoostedTrees,
    /// Name of the correction stage used during fit, kept for lineage only.
    correction: Option<String>,
}

impl FittedPipeline {
    pub fn from_parts(scaler: StandardScaler, classifier: GradientBoostedTrees) -> Self {
        Self {
            schema: FeatureSchema::canonical(),
            scaler,
            classifier,
            correction: None,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn params(&self) -> &BoostParams {
        self.classifier.params()
    }

    pub fn correction(&self) -> Option<&str> {
        self.correction.as_deref()
    }

    /// Check that the stages agree with the schema's arity.
    pub fn validate(&self) -> FraudResult<()> {
        self.schema.validate()?;
        if self.scaler.n_features() != FEATURE_COUNT || self.classifier.n_features() != FEATURE_COUNT {
            return Err(FraudError::Schema(format!(
                "pipeline stages expect {}/{} features, schema has {}",
                self.scaler.n_features(),
                self.classifier.n_features(),
                FEATURE_COUNT
            )));
        }
        Ok(())
    }

    /// `[P(legit), P(fraud)]` for one transaction.
    pub fn predict_proba(&self, x: &FeatureVector) -> FraudResult<[f64; 2]> {
        let mut scaled = [0.0f64; FEATURE_COUNT];
        self.scaler.transform_row(x.as_slice(), &mut scaled);
        let p = self
            .classifier
            .predict_proba_row(&scaled)
            .filter(|p| p.is_finite())
            .ok_or(FraudError::InternalScoring)?
            .clamp(0.0, 1.0);
        Ok([1.0 - p, p])
    }

    pub fn predict(&self, x: &FeatureVector) -> FraudResult<Label> {
        let [_, fraud] = self.predict_proba(x)?;
        Ok(if fraud > self.params().decision_threshold {
            Label::Fraud
        } else {
            Label::Legit
        })
    }

    pub fn evaluate(&self, features: &[FeatureVector], labels: &[Label]) -> FraudResult<EvaluationMetrics> {
        let mut probs = Vec::with_capacity(features.len());
        let mut preds = Vec::with_capacity(features.len());
        for x in features {
            probs.push(self.predict_proba(x)?[1]);
            preds.push(self.predict(x)?);
        }
        metrics::evaluate(labels, &probs, &preds)
    }
}

struct FitPlan {
    correction: Box<dyn ImbalanceCorrection>,
    params: BoostParams,
}

enum Mode {
    Fitting(FitPlan),
    Scoring(FittedPipeline),
}

pub struct TrainingPipeline {
    mode: Mode,
}

impl TrainingPipeline {
    pub fn new(correction: Box<dyn ImbalanceCorrection>, params: BoostParams) -> Self {
        Self {
            mode: Mode::Fitting(FitPlan { correction, params }),
        }
    }

    pub fn with_smote(smote: SmoteConfig, params: BoostParams) -> Self {
        Self::new(Box::new(Smote::new(smote)), params)
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.mode, Mode::Scoring(_))
    }

    /// Fit scaler on raw training features, resample the scaled set, then fit the classifier.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> FraudResult<()> {
        let Mode::Fitting(plan) = &self.mode else {
            return Err(FraudError::AlreadyFitted);
        };
        if x.ncols() != FEATURE_COUNT {
            return Err(FraudError::Schema(format!(
                "training matrix has {} columns, expected {}",
                x.ncols(),
                FEATURE_COUNT
            )));
        }
        if x.nrows() != y.len() {
            return Err(FraudError::Schema(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FraudError::Schema("training features contain non-finite values".into()));
        }
        if let Some(bad) = y.iter().find(|&&l| l > 1) {
            return Err(FraudError::Schema(format!("label {} is not 0 or 1", bad)));
        }

        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x);
        let (x_bal, y_bal) = plan.correction.resample(&scaled, y)?;
        info!(
            rows = x.nrows(),
            resampled = x_bal.nrows(),
            correction = plan.correction.name(),
            "fitting classifier"
        );
        let classifier = GradientBoostedTrees::fit(&x_bal, &y_bal, &plan.params)?;

        let fitted = FittedPipeline {
            schema: FeatureSchema::canonical(),
            scaler,
            classifier,
            correction: Some(plan.correction.name().to_string()),
        };
        self.mode = Mode::Scoring(fitted);
        Ok(())
    }

    pub fn fit_records(&mut self, records: &[LabeledRecord]) -> FraudResult<()> {
        let (x, y) = to_design_matrix(records);
        self.fit(&x, &y)
    }

    pub fn fitted(&self) -> FraudResult<&FittedPipeline> {
        match &self.mode {
            Mode::Scoring(p) => Ok(p),
            Mode::Fitting(_) => Err(FraudError::NotFitted),
        }
    }

    pub fn into_fitted(self) -> FraudResult<FittedPipeline> {
        match self.mode {
            Mode::Scoring(p) => Ok(p),
            Mode::Fitting(_) => Err(FraudError::NotFitted),
        }
    }

    pub fn predict(&self, x: &FeatureVector) -> FraudResult<Label> {
        self.fitted()?.predict(x)
    }

    pub fn predict_proba(&self, x: &FeatureVector) -> FraudResult<[f64; 2]> {
        self.fitted()?.predict_proba(x)
    }

    pub fn evaluate(&self, features: &[FeatureVector], labels: &[Label]) -> FraudResult<EvaluationMetrics> {
        self.fitted()?.evaluate(features, labels)
    }
}
