use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::PersistedStatus;
use crate::errors::PersistenceError;
use crate::files::write_atomic;

/// File-backed status snapshot.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no run was ever persisted.
    pub async fn load(&self) -> Result<Option<PersistedStatus>, PersistenceError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::ReadFailed {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PersistenceError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn save(&self, status: &PersistedStatus) -> Result<(), PersistenceError> {
        let write_failed = |reason: String| PersistenceError::WriteFailed {
            path: self.path.display().to_string(),
            reason,
        };

        let body = serde_json::to_vec_pretty(status).map_err(|e| write_failed(e.to_string()))?;
        write_atomic(&self.path, &body)
            .await
            .map_err(|e| write_failed(e.to_string()))?;

        debug!("Scheduler status written to {}", self.path.display());
        Ok(())
    }
}
