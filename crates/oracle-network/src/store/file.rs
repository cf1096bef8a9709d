//! JSON file snapshot store
//!
//! Saves write to a sibling temp file and rename over the target, so a crash
//! mid-save leaves the previous snapshot intact.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::network::NetworkSnapshot;
use crate::store::traits::{StateStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> StoreResult<Option<NetworkSnapshot>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot file");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let snapshot: NetworkSnapshot = serde_json::from_str(&content)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        info!(
            path = %self.path.display(),
            oracles = snapshot.registry.len(),
            "Snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &NetworkSnapshot) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, content)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), events = snapshot.events.len(), "Snapshot saved");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "json_file"
    }
}
