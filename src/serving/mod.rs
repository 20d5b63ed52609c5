//! Online scoring: model lifecycle and the HTTP endpoints in front of it.

pub mod http;
mod service;

pub use http::router;
pub use service::{ActiveModel, HealthReport, InferenceService, LoadOutcome, ScoreResult, ServiceState};
