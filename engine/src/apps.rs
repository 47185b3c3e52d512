//! The app launcher list the UI shows. The service only stores it; launching happens in the
//! user's session.

use std::{io, path::PathBuf};

use shared_std::models::AppEntry;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppStoreError {
    #[error("invalid app entry: {0}")]
    Invalid(&'static str),
    #[error("could not access app store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("app store {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON file backed list of [`AppEntry`]. Every mutation rewrites the file.
pub struct AppStore {
    path: PathBuf,
    entries: Mutex<Vec<AppEntry>>,
}

impl AppStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub async fn load(path: PathBuf) -> Result<Self, AppStoreError> {
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| AppStoreError::Malformed {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(AppStoreError::Io { path, source }),
        };

        Ok(AppStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// All entries ordered by name, ignoring case.
    pub async fn list(&self) -> Vec<AppEntry> {
        let mut entries = self.entries.lock().await.clone();
        entries.sort_by_key(|e| e.name.to_lowercase());
        entries
    }

    /// Inserts or replaces an entry, keyed by id. A blank id gets a freshly generated one.
    pub async fn save(&self, mut entry: AppEntry) -> Result<AppEntry, AppStoreError> {
        if entry.name.trim().is_empty() {
            return Err(AppStoreError::Invalid("name must not be empty"));
        }
        if entry.path.trim().is_empty() {
            return Err(AppStoreError::Invalid("path must not be empty"));
        }
        if entry.id.trim().is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }

        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        match updated.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => updated.push(entry.clone()),
        }

        self.persist(&updated).await?;
        *entries = updated;

        info!("Saved app '{}' ({})", entry.name, entry.id);
        Ok(entry)
    }

    /// Removes the entry with `id`. Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, AppStoreError> {
        let mut entries = self.entries.lock().await;
        if !entries.iter().any(|e| e.id == id) {
            return Ok(false);
        }

        let remaining: Vec<AppEntry> = entries.iter().filter(|e| e.id != id).cloned().collect();
        self.persist(&remaining).await?;
        *entries = remaining;

        info!("Deleted app {id}");
        Ok(true)
    }

    /// Writes a sibling temp file, then renames it over the store.
    async fn persist(&self, entries: &[AppEntry]) -> Result<(), AppStoreError> {
        let io_error = |source: io::Error| AppStoreError::Io { path: self.path.clone(), source };

        let contents =
            serde_json::to_vec_pretty(entries).map_err(|source| AppStoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
        }

        let temp = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp, contents).await.map_err(io_error)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(io_error)
    }
}
