//! Application configuration: JSON file, then environment overrides.

use crate::data::DatasetSplitter;
use crate::error::FraudResult;
use crate::pipeline::{BoostParams, SmoteConfig};
use crate::registry::ModelUri;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MODEL_URI: &str = "models:/fraud-detection-v2@production";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model registry backend
    pub registry: RegistryConfig,
    /// Train/test partitioning
    pub split: SplitConfig,
    /// Pipeline hyperparameters and publishing
    pub training: TrainingConfig,
    /// Scoring service
    pub serve: ServeConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// SQLite database holding model versions and aliases
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Registered model name
    pub model_name: String,
    /// Alias moved to each newly published version; `None` leaves aliases alone
    pub promote_alias: Option<String>,
    pub smote: SmoteConfig,
    pub classifier: BoostParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub bind_addr: String,
    /// `name@alias` or `name/version`, resolved once at startup
    pub model_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mlruns/registry.db"),
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_name: "fraud-detection-v2".to_string(),
            promote_alias: Some("production".to_string()),
            smote: SmoteConfig::default(),
            classifier: BoostParams::default(),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            model_uri: DEFAULT_MODEL_URI.to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SplitConfig {
    pub fn splitter(&self) -> FraudResult<DatasetSplitter> {
        DatasetSplitter::new(self.test_fraction, self.seed)
    }
}

impl ServeConfig {
    pub fn model_uri(&self) -> FraudResult<ModelUri> {
        self.model_uri.parse()
    }
}

impl AppConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AppConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }

    /// `MODEL_URI`, `PORT` and `REGISTRY_PATH` override the file.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = get("MODEL_URI") {
            self.serve.model_uri = uri;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse::<u16>().ok()) {
            let host = self
                .serve
                .bind_addr
                .rsplit_once(':')
                .map(|(h, _)| h.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.serve.bind_addr = format!("{}:{}", host, port);
        }
        if let Some(path) = get("REGISTRY_PATH") {
            self.registry.path = PathBuf::from(path);
        }
    }
}
