//! Inference service: owns the single active model and scores requests against it.
//!
//! The active model sits behind one `RwLock<Slot>` whose write side is only taken
//! to swap in a fully loaded `Arc<ActiveModel>`. Scoring clones the `Arc` under a
//! short read lock and then runs lock-free, so a request in flight keeps using
//! the model it started with even if a reload lands halfway through.

use crate::error::{FraudError, FraudResult};
use crate::features::{FeatureSchema, FeatureVector, Label};
use crate::registry::{ModelArtifact, ModelRegistry, ModelUri, ModelVersion};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Uninitialized,
    Ready,
    Degraded,
    Shutdown,
}

/// A loaded artifact plus when it was installed.
#[derive(Debug)]
pub struct ActiveModel {
    pub artifact: ModelArtifact,
    pub loaded_at: DateTime<Utc>,
}

impl ActiveModel {
    pub fn schema(&self) -> &FeatureSchema {
        &self.artifact.schema
    }

    pub fn version(&self) -> ModelVersion {
        self.artifact.version
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub is_fraud: bool,
    pub fraud_probability: f64,
    /// Probability of whichever label was predicted, not of fraud.
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub model_loaded: bool,
    pub state: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<ModelVersion>,
    /// Category of the most recent load failure, without detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// What a load/reload attempt did to the service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(ModelVersion),
    /// Resolve failed; the previous state (Ready or Degraded) was kept.
    /// Carries the error category only; the full error is logged.
    Failed(String),
    /// A newer reload was started before this one finished; result discarded.
    Superseded,
    /// The service was shut down; result discarded.
    Stopped,
}

struct Slot {
    state: ServiceState,
    active: Option<Arc<ActiveModel>>,
    last_error: Option<String>,
}

pub struct InferenceService {
    registry: Arc<dyn ModelRegistry>,
    model_uri: ModelUri,
    slot: RwLock<Slot>,
    load_seq: AtomicU64,
}

impl InferenceService {
    pub fn new(registry: Arc<dyn ModelRegistry>, model_uri: ModelUri) -> Self {
        Self {
            registry,
            model_uri,
            slot: RwLock::new(Slot {
                state: ServiceState::Uninitialized,
                active: None,
                last_error: None,
            }),
            load_seq: AtomicU64::new(0),
        }
    }

    pub fn model_uri(&self) -> &ModelUri {
        &self.model_uri
    }

    pub fn state(&self) -> ServiceState {
        self.slot.read().state
    }

    pub fn active_model(&self) -> Option<Arc<ActiveModel>> {
        self.slot.read().active.clone()
    }

    pub fn health(&self) -> HealthReport {
        let slot = self.slot.read();
        HealthReport {
            status: "healthy",
            model_loaded: slot.active.is_some(),
            state: slot.state,
            model_version: slot.active.as_ref().map(|m| m.version()),
            last_error: slot.last_error.clone(),
        }
    }

    /// Resolve the configured reference and install it. Blocks on the registry;
    /// call from a blocking context. Used for both startup and explicit reload.
    pub fn load(&self) -> LoadOutcome {
        let ticket = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        info!(uri = %self.model_uri, ticket, "loading model");
        let resolved = self.registry.resolve(&self.model_uri);

        let mut slot = self.slot.write();
        if slot.state == ServiceState::Shutdown {
            return LoadOutcome::Stopped;
        }
        if self.load_seq.load(Ordering::SeqCst) != ticket {
            info!(ticket, "model load superseded by a newer reload; discarding");
            return LoadOutcome::Superseded;
        }
        match resolved {
            Ok(artifact) => {
                let version = artifact.version;
                info!(
                    name = %artifact.name,
                    version = version.0,
                    roc_auc = artifact.metrics.roc_auc,
                    "model loaded"
                );
                slot.active = Some(Arc::new(ActiveModel {
                    artifact,
                    loaded_at: Utc::now(),
                }));
                slot.state = ServiceState::Ready;
                slot.last_error = None;
                LoadOutcome::Loaded(version)
            }
            Err(e) => {
                let category = e.category();
                if slot.state == ServiceState::Ready {
                    warn!(error = %e, uri = %self.model_uri, "model reload failed; keeping active model");
                } else {
                    error!(error = %e, uri = %self.model_uri, "model load failed; service degraded");
                    slot.state = ServiceState::Degraded;
                }
                slot.last_error = Some(category.to_string());
                LoadOutcome::Failed(category.to_string())
            }
        }
    }

    /// Async wrapper that runs `load` on the blocking pool, off the request path.
    pub async fn load_in_background(self: &Arc<Self>) -> LoadOutcome {
        let svc = Arc::clone(self);
        match tokio::task::spawn_blocking(move || svc.load()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "model load task failed");
                LoadOutcome::Failed("model load task failed".to_string())
            }
        }
    }

    /// Clear the active model. Terminal.
    pub fn shutdown(&self) {
        let mut slot = self.slot.write();
        slot.state = ServiceState::Shutdown;
        slot.active = None;
        info!("inference service shut down");
    }

    /// Score one raw feature vector against the active model.
    pub fn score(&self, features: &[f64]) -> FraudResult<ScoreResult> {
        let model = {
            let slot = self.slot.read();
            match (&slot.state, &slot.active) {
                (ServiceState::Ready, Some(m)) => Arc::clone(m),
                _ => return Err(FraudError::ModelUnavailable),
            }
        };

        let arity = model.schema().arity();
        if features.len() != arity {
            return Err(FraudError::InvalidInput(format!(
                "expected {} features, got {}",
                arity,
                features.len()
            )));
        }
        let vector = FeatureVector::from_slice(features)?;

        let pipeline = &model.artifact.pipeline;
        let outcome = catch_unwind(AssertUnwindSafe(|| -> FraudResult<(Label, [f64; 2])> {
            Ok((pipeline.predict(&vector)?, pipeline.predict_proba(&vector)?))
        }));
        let (label, probs) = match outcome {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                error!(error = %e, version = model.version().0, "scoring failed");
                return Err(FraudError::InternalScoring);
            }
            Err(_) => {
                error!(version = model.version().0, "scoring panicked");
                return Err(FraudError::InternalScoring);
            }
        };

        let fraud_probability = probs[1];
        if !(0.0..=1.0).contains(&fraud_probability) {
            error!(fraud_probability, "classifier returned out-of-range probability");
            return Err(FraudError::InternalScoring);
        }
        let is_fraud = label == Label::Fraud;
        let confidence = if is_fraud { probs[1] } else { probs[0] };
        Ok(ScoreResult {
            is_fraud,
            fraud_probability,
            confidence,
        })
    }
}
