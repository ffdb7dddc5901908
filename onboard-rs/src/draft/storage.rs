//! Draft persistence backends

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::EmployeeDraft;
use crate::error::{OnboardError, Result};

/// Key/value persistence for drafts
#[async_trait]
pub trait DraftStorage: Send + Sync {
    /// Unreadable or corrupt entries load as `None`
    async fn read(&self, key: &str) -> Result<Option<EmployeeDraft>>;

    async fn write(&self, key: &str, draft: &EmployeeDraft) -> Result<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage holding serialized drafts
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized entry, for inspection in tests
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert_raw(&self, key: &str, raw: &str) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), raw.to_string());
    }
}

#[async_trait]
impl DraftStorage for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<EmployeeDraft>> {
        let entries = self.entries.lock().await;
        let Some(raw) = entries.get(key) else {
            return Ok(None);
        };

        match serde_json::from_str(raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                warn!("Failed to parse draft '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, draft: &EmployeeDraft) -> Result<()> {
        let raw = serde_json::to_string(draft)?;
        self.entries.lock().await.insert(key.to_string(), raw);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(OnboardError::Storage(format!("Invalid draft key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl DraftStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<EmployeeDraft>> {
        let path = self.path_for(key)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!("Failed to read draft {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        match serde_json::from_str(&raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                warn!("Failed to parse draft {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, draft: &EmployeeDraft) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash never leaves a half-written draft
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(draft)?;
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Draft saved to {}", path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
