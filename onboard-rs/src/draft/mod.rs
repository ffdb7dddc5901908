//! Employee draft and its debounced persistence
//!
//! [`DraftStore`] keeps the latest merged draft in memory and writes it to a
//! [`DraftStorage`] backend once edits have been quiet for the debounce
//! window. The storage key is chosen by the caller (see [`crate::role::Role::draft_key`]).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{Department, Location};
use crate::debounce::Debouncer;
use crate::error::Result;

pub mod storage;

pub use storage::{DraftStorage, FileStorage, MemoryStorage};

/// Step 1: contact info
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub emergency_contact: String,
}

/// Step 2: references, derived identifier, photo and notes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailSelection {
    pub department: Option<Department>,
    pub location: Option<Location>,
    pub employee_id: String,
    pub photo_data_url: Option<String>,
    pub notes: String,
}

/// Whole wizard form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeDraft {
    pub step1: ContactInfo,
    pub step2: DetailSelection,
}

/// Partial update; present sections replace the stored ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step1: Option<ContactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step2: Option<DetailSelection>,
}

impl DraftPatch {
    pub fn step1(contact: ContactInfo) -> Self {
        Self {
            step1: Some(contact),
            step2: None,
        }
    }

    pub fn step2(details: DetailSelection) -> Self {
        Self {
            step1: None,
            step2: Some(details),
        }
    }
}

impl EmployeeDraft {
    pub fn merge(&mut self, patch: DraftPatch) {
        if let Some(step1) = patch.step1 {
            self.step1 = step1;
        }
        if let Some(step2) = patch.step2 {
            self.step2 = step2;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Default)]
struct DraftState {
    latest: Option<EmployeeDraft>,
    /// Bumped by `clear`; writes scheduled under an older epoch are dropped
    epoch: u64,
}

/// Debounced, merging draft store bound to one key
///
/// Writes run while holding the state lock, so `clear` waits for a write that
/// is already in progress and no earlier write can land after it.
pub struct DraftStore {
    storage: Arc<dyn DraftStorage>,
    key: String,
    debouncer: Debouncer,
    state: Arc<Mutex<DraftState>>,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn DraftStorage>, key: impl Into<String>, delay: Duration) -> Self {
        Self {
            storage,
            key: key.into(),
            debouncer: Debouncer::new(delay),
            state: Arc::new(Mutex::new(DraftState::default())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Merge `patch` into the latest draft and schedule a write; returns the merged draft
    pub async fn save(&self, patch: DraftPatch) -> Result<EmployeeDraft> {
        let mut state = self.state.lock().await;
        let mut next = match state.latest.take() {
            Some(draft) => draft,
            None => self.storage.read(&self.key).await?.unwrap_or_default(),
        };
        next.merge(patch);
        state.latest = Some(next.clone());
        let epoch = state.epoch;
        drop(state);

        let shared = self.state.clone();
        let storage = self.storage.clone();
        let key = self.key.clone();
        let snapshot = next.clone();
        self.debouncer.schedule(async move {
            let state = shared.lock().await;
            if state.epoch != epoch {
                debug!("Dropping draft write for '{}' scheduled before clear", key);
                return;
            }
            if let Err(e) = storage.write(&key, &snapshot).await {
                warn!("Failed to save draft '{}': {}", key, e);
            }
        });

        Ok(next)
    }

    /// Read the persisted draft, resetting the in-memory copy to it
    pub async fn load(&self) -> Result<Option<EmployeeDraft>> {
        let mut state = self.state.lock().await;
        let stored = self.storage.read(&self.key).await?;
        state.latest = stored.clone();
        Ok(stored)
    }

    /// Drop pending writes and delete the persisted draft
    pub async fn clear(&self) -> Result<()> {
        self.debouncer.cancel();
        let mut state = self.state.lock().await;
        state.epoch += 1;
        state.latest = None;
        self.storage.remove(&self.key).await?;
        debug!("Draft '{}' cleared", self.key);
        Ok(())
    }

    /// Write the latest draft now instead of waiting for the timer
    pub async fn flush(&self) -> Result<()> {
        self.debouncer.cancel();
        let state = self.state.lock().await;
        if let Some(draft) = &state.latest {
            self.storage.write(&self.key, draft).await?;
        }
        Ok(())
    }

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }
}
