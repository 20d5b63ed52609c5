//! fraudscore: fraud classifier training pipeline and online scoring service.
//!
//! Modular structure:
//! - [`features`]: Transaction feature vectors and the ordered 30-field schema
//! - [`data`]: CSV ingestion, stratified splitting, persisted train/test tables
//! - [`pipeline`]: Scaler + SMOTE + boosted trees, fit once then sealed
//! - [`registry`]: Versioned model artifacts with aliases (in-memory and SQLite)
//! - [`training`]: Offline training entry point
//! - [`serving`]: Inference service and HTTP surface
//! - [`logging`]: Structured logging setup

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod serving;
pub mod training;

pub use config::AppConfig;
pub use data::{DatasetSplit, DatasetSplitter};
pub use error::{FraudError, FraudResult};
pub use features::{FeatureSchema, FeatureVector, Label, LabeledRecord};
pub use logging::StructuredLogger;
pub use pipeline::{FittedPipeline, TrainingPipeline};
pub use registry::{ModelArtifact, ModelRegistry, ModelUri, SqliteRegistry};
pub use serving::{InferenceService, ScoreResult, ServiceState};
pub use training::{run_training, TrainingReport};
