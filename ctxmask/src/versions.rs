//! Named system-prompt versions persisted to a JSON file.
//!
//! The file maps version names to `{ prompt, created, modified }` records.
//! A missing or empty file is an empty store.

use chrono::Local;
use ctxmask_core::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One saved system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptVersion {
    /// Prompt text
    pub prompt: String,
    /// Local time of the first save
    pub created: String,
    /// Local time of the last save
    pub modified: String,
}

/// Version map keyed by name.
pub type Versions = BTreeMap<String, PromptVersion>;

/// File-backed store of prompt versions.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    /// Creates a store over a file path. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every saved version.
    ///
    /// # Errors
    /// Returns an I/O error if the file exists but cannot be read, and a
    /// serialization error if it is not a version map.
    pub async fn load(&self) -> Result<Versions> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Versions::new()),
            Err(source) => {
                return Err(ContextError::Io {
                    context: format!("Failed to read versions from {}", self.path.display()),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Versions::new());
        }
        let versions: Versions = serde_json::from_str(&content).map_err(|e| {
            ContextError::serialization(
                format!("Malformed versions file {}", self.path.display()),
                e,
            )
        })?;
        debug!("Loaded {} prompt versions", versions.len());
        Ok(versions)
    }

    async fn store(&self, versions: &Versions) -> Result<()> {
        let json = serde_json::to_string_pretty(versions)
            .map_err(|e| ContextError::serialization("Prompt versions", e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| ContextError::Io {
                context: format!("Failed to write versions to {}", self.path.display()),
                source,
            })
    }

    /// Looks up one version.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub async fn get(&self, name: &str) -> Result<Option<PromptVersion>> {
        Ok(self.load().await?.remove(name))
    }

    /// Creates or updates a version; an update keeps its creation time.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written.
    pub async fn save_version(&self, name: &str, prompt: &str) -> Result<PromptVersion> {
        let mut versions = self.load().await?;
        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();

        let version = versions
            .entry(name.to_string())
            .and_modify(|version| {
                version.prompt = prompt.to_string();
                version.modified = now.clone();
            })
            .or_insert_with(|| PromptVersion {
                prompt: prompt.to_string(),
                created: now.clone(),
                modified: now.clone(),
            })
            .clone();

        self.store(&versions).await?;
        info!("Saved prompt version '{}'", name);
        Ok(version)
    }

    /// Deletes a version. Returns whether it existed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written.
    pub async fn delete_version(&self, name: &str) -> Result<bool> {
        let mut versions = self.load().await?;
        if versions.remove(name).is_none() {
            return Ok(false);
        }
        self.store(&versions).await?;
        info!("Deleted prompt version '{}'", name);
        Ok(true)
    }
}
