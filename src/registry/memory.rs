//! Process-local registry, used by tests and single-process demos.

use super::{ArtifactDraft, ModelArtifact, ModelRef, ModelRegistry, ModelUri, ModelVersion};
use crate::error::{FraudError, FraudResult};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Entry {
    versions: Vec<ModelArtifact>,
    aliases: HashMap<String, ModelVersion>,
}

#[derive(Default)]
pub struct InMemoryRegistry {
    models: RwLock<HashMap<String, Entry>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn publish(&self, draft: &ArtifactDraft) -> FraudResult<ModelVersion> {
        let mut models = self.models.write();
        let entry = models.entry(draft.name.clone()).or_default();
        let version = ModelVersion(entry.versions.last().map_or(1, |a| a.version.0 + 1));
        let artifact = draft.seal(version)?;
        entry.versions.push(artifact);
        Ok(version)
    }

    fn resolve(&self, uri: &ModelUri) -> FraudResult<ModelArtifact> {
        let models = self.models.read();
        let not_found = || FraudError::ModelNotFound(uri.to_string());
        let entry = models.get(&uri.name).ok_or_else(not_found)?;
        let version = match &uri.reference {
            ModelRef::Version(v) => ModelVersion(*v),
            ModelRef::Alias(a) => *entry.aliases.get(a).ok_or_else(not_found)?,
            ModelRef::Latest => entry.versions.last().ok_or_else(not_found)?.version,
        };
        let artifact = entry
            .versions
            .iter()
            .find(|a| a.version == version)
            .cloned()
            .ok_or_else(not_found)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn set_alias(&self, name: &str, alias: &str, version: ModelVersion) -> FraudResult<()> {
        let mut models = self.models.write();
        let entry = models
            .get_mut(name)
            .filter(|e| e.versions.iter().any(|a| a.version == version))
            .ok_or_else(|| FraudError::ModelNotFound(ModelUri::version(name, version.0).to_string()))?;
        entry.aliases.insert(alias.to_string(), version);
        Ok(())
    }

    fn versions(&self, name: &str) -> FraudResult<Vec<ModelVersion>> {
        Ok(self
            .models
            .read()
            .get(name)
            .map(|e| e.versions.iter().map(|a| a.version).collect())
            .unwrap_or_default())
    }
}
