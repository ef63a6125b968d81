//! Local filesystem backend for the saved-item collection.
//!
//! Persists one JSON blob per key under a data directory, with atomic
//! temp-file + rename commits so readers never observe a torn write.
//! Change notifications are in-process only: an external sync daemon
//! mutating the same files is out of scope, and hosts that need
//! cross-process coherence bring their own [`SyncBackend`] behind the
//! same trait.

use crate::backend::{ChangeHub, SyncBackend};
use crate::{Error, Result};
use async_trait::async_trait;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::debug;

/// Maximum allowed key length for file-backed storage.
const MAX_KEY_LEN: usize = 64;

/// Filesystem-backed [`SyncBackend`] storing each key as `<key>.json`.
pub struct JsonFileBackend {
    root_dir: PathBuf,
    changes: ChangeHub,
}

impl JsonFileBackend {
    /// Creates a backend rooted at the default data directory.
    ///
    /// Resolution order: the `STASH_DATA_DIR` environment variable,
    /// then `XDG_DATA_HOME/stash`, then `~/.stash`.
    pub fn new() -> Result<Self> {
        if let Ok(dir) = std::env::var("STASH_DATA_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                return Self::with_root(PathBuf::from(trimmed));
            }
        }

        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            let trimmed = xdg.trim();
            if !trimmed.is_empty() {
                return Self::with_root(PathBuf::from(trimmed).join("stash"));
            }
        }

        let base = BaseDirs::new().ok_or_else(|| {
            Error::BackendUnavailable("failed to determine home directory".into())
        })?;
        Self::with_root(base.home_dir().join(".stash"))
    }

    /// Creates a backend rooted at an explicit directory.
    pub fn with_root(root_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root_dir).map_err(|e| {
            Error::BackendUnavailable(format!("failed to create data directory: {e}"))
        })?;
        Ok(Self {
            root_dir,
            changes: ChangeHub::default(),
        })
    }

    /// Returns the root data directory path.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Validate that a key is safe to use as a file name.
    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::BackendUnavailable("key cannot be empty".into()));
        }

        if key.len() > MAX_KEY_LEN {
            return Err(Error::BackendUnavailable(format!(
                "invalid key '{key}': exceeds maximum length of {MAX_KEY_LEN} characters"
            )));
        }

        // Conservative character set keeps the path rooted at the data
        // directory on every platform.
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::BackendUnavailable(format!(
                "invalid key '{key}': only [A-Za-z0-9_-] are allowed"
            )));
        }

        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.root_dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SyncBackend for JsonFileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::BackendUnavailable(format!(
                "failed to read '{key}': {e}"
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value).await.map_err(|e| {
            Error::BackendUnavailable(format!("failed to write '{key}': {e}"))
        })?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            tokio::fs::remove_file(&path).await.map_err(|e| {
                Error::BackendUnavailable(format!("failed to replace '{key}': {e}"))
            })?;
        }

        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            Error::BackendUnavailable(format!("failed to commit '{key}': {e}"))
        })?;

        debug!(%key, "committed blob");
        self.changes.notify(key);
        Ok(())
    }

    fn watch(&self, key: &str) -> broadcast::Receiver<()> {
        self.changes.watch(key)
    }
}
