//! Local filesystem storage implementation.
//!
//! Writes go to `{path}.tmp` first and are renamed over `{path}`, so a crash
//! leaves either the old or the new file. A stray temp file from an
//! interrupted write is never read.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::State;
use crate::storage::StateStorage;

/// JSON state file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
    /// SHA-256 of the bytes last read from or written to `path`
    fingerprint: Option<String>,
}

impl LocalStorage {
    /// Create a LocalStorage for the given state file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Directory holding the state file; `.` for a bare file name.
    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.parent_dir()).await?;
        Ok(())
    }

    /// Persist the directory entry so a completed rename survives power loss.
    #[cfg(unix)]
    async fn sync_dir(&self) -> std::io::Result<()> {
        tokio::fs::File::open(self.parent_dir()).await?.sync_all().await
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.tmp_path();
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);

            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Io(e));
        }
        self.sync_dir().await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn digest(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }
}

#[async_trait]
impl StateStorage for LocalStorage {
    async fn load(&mut self) -> Result<State> {
        let Some(bytes) = self.read_bytes().await? else {
            log::info!(
                "No state at {}, starting from a clean slate",
                self.path.display()
            );
            self.fingerprint = None;
            return Ok(State::empty());
        };

        let state: State = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::state_corrupt(&self.path, e))?;

        log::debug!(
            "Loaded state from {} ({} active types)",
            self.path.display(),
            state.last_alerts.len()
        );
        self.fingerprint = Some(Self::digest(&bytes));
        Ok(state)
    }

    async fn flush(&mut self, state: &State) -> Result<bool> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let digest = Self::digest(&bytes);

        if self.fingerprint.as_deref() == Some(digest.as_str()) {
            log::debug!("State unchanged, skipping write to {}", self.path.display());
            return Ok(false);
        }

        self.write_bytes(&bytes).await?;
        self.fingerprint = Some(digest);
        log::debug!("State flushed to {}", self.path.display());
        Ok(true)
    }
}
