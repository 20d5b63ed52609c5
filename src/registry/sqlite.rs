//! SQLite-backed registry. Each version row stores the artifact as JSON plus a
//! SHA-256 of that exact text; a mismatch on read fails the resolve.

use super::{ArtifactDraft, ModelArtifact, ModelRef, ModelRegistry, ModelUri, ModelVersion};
use crate::error::{FraudError, FraudResult};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

fn checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Open or create the registry database at `path`.
    pub fn open(path: &Path) -> FraudResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> FraudResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> FraudResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS model_versions (
                name TEXT NOT NULL,
                version INTEGER NOT NULL,
                run_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                payload TEXT NOT NULL,
                checksum TEXT NOT NULL,
                PRIMARY KEY (name, version)
            );
            CREATE TABLE IF NOT EXISTS model_aliases (
                name TEXT NOT NULL,
                alias TEXT NOT NULL,
                version INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (name, alias)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn version_for(conn: &Connection, uri: &ModelUri) -> FraudResult<Option<u32>> {
        let v = match &uri.reference {
            ModelRef::Version(v) => Some(*v),
            ModelRef::Alias(alias) => conn
                .query_row(
                    "SELECT version FROM model_aliases WHERE name = ?1 AND alias = ?2",
                    params![uri.name, alias],
                    |row| row.get(0),
                )
                .optional()?,
            ModelRef::Latest => conn.query_row(
                "SELECT MAX(version) FROM model_versions WHERE name = ?1",
                params![uri.name],
                |row| row.get::<_, Option<u32>>(0),
            )?,
        };
        Ok(v)
    }
}

impl ModelRegistry for SqliteRegistry {
    fn publish(&self, draft: &ArtifactDraft) -> FraudResult<ModelVersion> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let next: u32 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM model_versions WHERE name = ?1",
            params![draft.name],
            |row| row.get(0),
        )?;
        let artifact = draft.seal(ModelVersion(next))?;
        let payload = serde_json::to_string(&artifact)?;
        let sum = checksum(&payload);
        // Plain INSERT: an existing (name, version) is a conflict, never an overwrite.
        tx.execute(
            "INSERT INTO model_versions (name, version, run_id, created_at, payload, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                artifact.name,
                next,
                artifact.run_id.to_string(),
                artifact.created_at.to_rfc3339(),
                payload,
                sum
            ],
        )?;
        tx.commit()?;
        info!(name = %artifact.name, version = next, checksum = %sum, "published model artifact");
        Ok(ModelVersion(next))
    }

    fn resolve(&self, uri: &ModelUri) -> FraudResult<ModelArtifact> {
        let conn = self.conn.lock();
        let version = Self::version_for(&conn, uri)?.ok_or_else(|| FraudError::ModelNotFound(uri.to_string()))?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT payload, checksum FROM model_versions WHERE name = ?1 AND version = ?2",
                params![uri.name, version],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        let (payload, stored) = row.ok_or_else(|| FraudError::ModelNotFound(uri.to_string()))?;
        if checksum(&payload) != stored {
            warn!(uri = %uri, version, "artifact checksum mismatch");
            return Err(FraudError::Registry(format!("checksum mismatch for {}/{}", uri.name, version)));
        }
        let artifact: ModelArtifact = serde_json::from_str(&payload)?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn set_alias(&self, name: &str, alias: &str, version: ModelVersion) -> FraudResult<()> {
        let conn = self.conn.lock();
        let exists: Option<u32> = conn
            .query_row(
                "SELECT version FROM model_versions WHERE name = ?1 AND version = ?2",
                params![name, version.0],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(FraudError::ModelNotFound(ModelUri::version(name, version.0).to_string()));
        }
        conn.execute(
            "INSERT INTO model_aliases (name, alias, version, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name, alias) DO UPDATE SET version = excluded.version, updated_at = excluded.updated_at",
            params![name, alias, version.0, Utc::now().to_rfc3339()],
        )?;
        info!(name, alias, version = version.0, "alias updated");
        Ok(())
    }

    fn versions(&self, name: &str) -> FraudResult<Vec<ModelVersion>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT version FROM model_versions WHERE name = ?1 ORDER BY version")?;
        let rows = stmt.query_map(params![name], |row| row.get::<_, u32>(0))?;
        let mut out = Vec::new();
        for v in rows {
            out.push(ModelVersion(v?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupted_payload_fails_checksum() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        {
            let conn = reg.conn.lock();
            conn.execute(
                "INSERT INTO model_versions (name, version, run_id, created_at, payload, checksum)
                 VALUES ('m', 1, 'r', 't', '{}', 'deadbeef')",
                [],
            )
            .unwrap();
        }
        let err = reg.resolve(&ModelUri::version("m", 1)).unwrap_err();
        assert!(matches!(err, FraudError::Registry(_)));
    }

    #[test]
    fn unknown_alias_is_not_found() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        let err = reg.resolve(&ModelUri::alias("m", "production")).unwrap_err();
        assert!(matches!(err, FraudError::ModelNotFound(_)));
        let err = reg.resolve(&"m/latest".parse().unwrap()).unwrap_err();
        assert!(matches!(err, FraudError::ModelNotFound(_)));
    }
}
