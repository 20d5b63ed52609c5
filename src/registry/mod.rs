//! Named, versioned model artifacts.
//!
//! Versions are immutable once published. Aliases (e.g. `production`) are
//! mutable pointers to a version and are re-read on every resolve.

mod memory;
mod sqlite;

pub use memory::InMemoryRegistry;
pub use sqlite::SqliteRegistry;

use crate::error::{FraudError, FraudResult};
use crate::features::FeatureSchema;
use crate::pipeline::{BoostParams, EvaluationMetrics, FittedPipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const URI_SCHEME: &str = "models:/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    Alias(String),
    Version(u32),
    Latest,
}

/// `name@alias`, `name/<version>` or `name/latest`, optionally prefixed with `models:/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub name: String,
    pub reference: ModelRef,
}

impl ModelUri {
    pub fn alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: ModelRef::Alias(alias.into()),
        }
    }

    pub fn version(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            reference: ModelRef::Version(version),
        }
    }
}

impl FromStr for ModelUri {
    type Err = FraudError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let s = s.strip_prefix(URI_SCHEME).unwrap_or(s);
        let bad = || FraudError::Config(format!("invalid model reference {:?}", raw));

        let (name, reference) = if let Some((name, alias)) = s.split_once('@') {
            if alias.is_empty() || alias.contains('/') {
                return Err(bad());
            }
            (name, ModelRef::Alias(alias.to_string()))
        } else if let Some((name, version)) = s.rsplit_once('/') {
            let reference = if version == "latest" {
                ModelRef::Latest
            } else {
                ModelRef::Version(version.parse().map_err(|_| bad())?)
            };
            (name, reference)
        } else {
            return Err(bad());
        };
        if name.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            name: name.to_string(),
            reference,
        })
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            ModelRef::Alias(a) => write!(f, "{}{}@{}", URI_SCHEME, self.name, a),
            ModelRef::Version(v) => write!(f, "{}{}/{}", URI_SCHEME, self.name, v),
            ModelRef::Latest => write!(f, "{}{}/latest", URI_SCHEME, self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelVersion(pub u32);

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable published snapshot of a fitted pipeline plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub version: ModelVersion,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub schema: FeatureSchema,
    pub params: BoostParams,
    pub metrics: EvaluationMetrics,
    pub input_example: Vec<Vec<f64>>,
    pub pipeline: FittedPipeline,
}

impl ModelArtifact {
    /// Load-time check: schema matches the constant arity and the pipeline agrees with it.
    pub fn validate(&self) -> FraudResult<()> {
        self.schema.validate()?;
        self.pipeline.validate()?;
        if self.pipeline.schema() != &self.schema {
            return Err(FraudError::Schema(format!(
                "artifact {}/{} schema does not match its pipeline",
                self.name, self.version
            )));
        }
        Ok(())
    }
}

/// Everything needed to publish; the registry assigns version and timestamp.
#[derive(Debug, Clone)]
pub struct ArtifactDraft {
    pub name: String,
    pub run_id: Uuid,
    pub schema: FeatureSchema,
    pub metrics: EvaluationMetrics,
    pub input_example: Vec<Vec<f64>>,
    pub pipeline: FittedPipeline,
}

impl ArtifactDraft {
    pub fn new(
        pipeline: FittedPipeline,
        name: impl Into<String>,
        metrics: EvaluationMetrics,
        schema: FeatureSchema,
    ) -> Self {
        Self {
            name: name.into(),
            run_id: Uuid::new_v4(),
            schema,
            metrics,
            input_example: Vec::new(),
            pipeline,
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_input_example(mut self, rows: Vec<Vec<f64>>) -> Self {
        self.input_example = rows;
        self
    }

    fn seal(&self, version: ModelVersion) -> FraudResult<ModelArtifact> {
        if self.name.is_empty() || self.name.contains('@') || self.name.contains('/') {
            return Err(FraudError::Config(format!("invalid model name {:?}", self.name)));
        }
        let artifact = ModelArtifact {
            name: self.name.clone(),
            version,
            run_id: self.run_id,
            created_at: Utc::now(),
            schema: self.schema.clone(),
            params: self.pipeline.params().clone(),
            metrics: self.metrics.clone(),
            input_example: self.input_example.clone(),
            pipeline: self.pipeline.clone(),
        };
        artifact.validate()?;
        Ok(artifact)
    }
}

/// Durable store of versioned pipelines. Publishing never overwrites.
pub trait ModelRegistry: Send + Sync {
    fn publish(&self, draft: &ArtifactDraft) -> FraudResult<ModelVersion>;

    /// Current artifact bound to `uri`; `ModelNotFound` if unresolved.
    fn resolve(&self, uri: &ModelUri) -> FraudResult<ModelArtifact>;

    /// Point `alias` at an existing version.
    fn set_alias(&self, name: &str, alias: &str, version: ModelVersion) -> FraudResult<()>;

    fn versions(&self, name: &str) -> FraudResult<Vec<ModelVersion>>;
}
