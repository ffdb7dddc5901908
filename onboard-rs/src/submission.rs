//! Multi-step submission pipeline
//!
//! `READY → STEP_A_SENT → STEP_B_SENT → VERIFYING → DONE`, with any failure
//! dropping back to `READY`. Step B is only sent once step A has been
//! acknowledged. A retry always replays the whole sequence with freshly
//! generated record identifiers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{BasicInfoRecord, DetailInfoRecord, OnboardApi};
use crate::config::SubmissionConfig;
use crate::draft::{DraftStore, EmployeeDraft};
use crate::error::OnboardError;
use crate::role::Role;
use crate::validation::{validate_details, validate_draft, FieldErrors};

/// Pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Progress {
    Ready,
    StepASent,
    StepBSent,
    Verifying,
    Done,
}

impl Progress {
    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Progress::Ready => "Waiting for submit",
            Progress::StepASent => "Saving basic info",
            Progress::StepBSent => "Saving details",
            Progress::Verifying => "Final verification",
            Progress::Done => "Done",
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observable pipeline state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionState {
    pub progress: Progress,
    pub is_submitting: bool,
    /// Last failure, shown as a single retryable banner
    pub last_error: Option<String>,
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self {
            progress: Progress::Ready,
            is_submitting: false,
            last_error: None,
        }
    }
}

/// Identifiers generated for one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptIds {
    pub basic_info_id: String,
    pub detail_info_id: String,
    pub captured_at: DateTime<Utc>,
}

impl AttemptIds {
    fn generate() -> Self {
        Self {
            basic_info_id: Uuid::new_v4().to_string(),
            detail_info_id: Uuid::new_v4().to_string(),
            captured_at: Utc::now(),
        }
    }
}

/// Successful submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub attempt: AttemptIds,
    pub employee_id: String,
    pub basic_info: serde_json::Value,
    pub detail_info: serde_json::Value,
}

/// Result of a `submit` call
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Completed(SubmissionReceipt),
    /// Local validation failed; nothing was sent
    Invalid(FieldErrors),
    /// Another submission is running; call ignored
    Busy,
    /// A remote step failed; state is back to READY and the draft is kept
    Failed(String),
}

type SuccessCallback = Arc<dyn Fn(&SubmissionReceipt) + Send + Sync>;

/// Sequenced writer for one wizard instance
pub struct SubmissionPipeline {
    api: OnboardApi,
    role: Role,
    settle_delay: Duration,
    busy: AtomicBool,
    state: Mutex<SubmissionState>,
    last_attempt: Mutex<Option<AttemptIds>>,
    events: broadcast::Sender<Progress>,
    draft: Option<Arc<DraftStore>>,
    on_success: Option<SuccessCallback>,
}

impl SubmissionPipeline {
    pub fn new(api: OnboardApi, role: Role, config: &SubmissionConfig) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            api,
            role,
            settle_delay: config.settle_delay(),
            busy: AtomicBool::new(false),
            state: Mutex::new(SubmissionState::default()),
            last_attempt: Mutex::new(None),
            events,
            draft: None,
            on_success: None,
        }
    }

    /// Draft cleared after a successful submission
    pub fn with_draft_store(mut self, draft: Arc<DraftStore>) -> Self {
        self.draft = Some(draft);
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SubmissionReceipt) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Progress transitions, in order, for every attempt
    pub fn subscribe(&self) -> broadcast::Receiver<Progress> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_attempt(&self) -> Option<AttemptIds> {
        self.last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Back to READY after DONE; ignored while submitting
    pub fn reset(&self) {
        if self.busy.load(Ordering::SeqCst) {
            return;
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SubmissionState::default();
    }

    /// Validate and send `draft`
    pub async fn submit(&self, draft: &EmployeeDraft) -> SubmitOutcome {
        if self.busy.load(Ordering::SeqCst) {
            debug!("Submission already running, ignoring submit");
            return SubmitOutcome::Busy;
        }

        let errors = validate_draft(draft, self.role);
        if !errors.is_empty() {
            debug!("Submission blocked by validation: {}", errors);
            return SubmitOutcome::Invalid(errors);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SubmitOutcome::Busy;
        }

        let mut guard = AttemptGuard {
            pipeline: self,
            finished: false,
        };
        let outcome = self.run(draft).await;
        guard.finished = true;
        outcome
    }

    /// Replay the full sequence after a failure
    pub async fn retry(&self, draft: &EmployeeDraft) -> SubmitOutcome {
        info!("Retrying submission from the first step");
        self.submit(draft).await
    }

    async fn run(&self, draft: &EmployeeDraft) -> SubmitOutcome {
        let (Some(department), Some(location)) = (&draft.step2.department, &draft.step2.location)
        else {
            self.busy.store(false, Ordering::SeqCst);
            return SubmitOutcome::Invalid(validate_details(&draft.step2));
        };

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.is_submitting = true;
            state.last_error = None;
        }

        let attempt = AttemptIds::generate();
        *self.last_attempt.lock().unwrap_or_else(PoisonError::into_inner) = Some(attempt.clone());

        let employee_id = draft.step2.employee_id.clone();
        let contact = &draft.step1;
        let details = &draft.step2;

        self.transition(Progress::StepASent);
        let basic = BasicInfoRecord {
            id: attempt.basic_info_id.clone(),
            employee_id: employee_id.clone(),
            department_id: department.id.clone(),
            department: department.name.clone(),
            full_name: contact.full_name.trim().to_string(),
            email: contact.email.trim().to_string(),
            role: self.role.to_string(),
            phone: contact.phone.trim().to_string(),
            emergency_contact: contact.emergency_contact.trim().to_string(),
            notes: details.notes.clone(),
            created_at: attempt.captured_at,
        };
        let basic_info = match self.api.post_basic_info(&basic).await {
            Ok(body) => body,
            Err(e) => return self.fail("basic info", e),
        };

        self.transition(Progress::StepBSent);
        let detail = DetailInfoRecord {
            id: attempt.detail_info_id.clone(),
            employee_id: employee_id.clone(),
            location_id: location.id.clone(),
            location: location.city.clone(),
            photo: details.photo_data_url.clone().unwrap_or_default(),
            notes: details.notes.clone(),
            created_at: attempt.captured_at,
        };
        let detail_info = match self.api.post_detail_info(&detail).await {
            Ok(body) => body,
            Err(e) => return self.fail("detail info", e),
        };

        // Placeholder beat: no read-back happens here
        self.transition(Progress::Verifying);
        tokio::time::sleep(self.settle_delay).await;

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.is_submitting = false;
        }
        self.transition(Progress::Done);
        self.busy.store(false, Ordering::SeqCst);
        info!("Employee {} submitted", employee_id);

        let receipt = SubmissionReceipt {
            attempt,
            employee_id,
            basic_info,
            detail_info,
        };

        if let Some(callback) = &self.on_success {
            callback(&receipt);
        }

        if let Some(drafts) = &self.draft {
            if let Err(e) = drafts.clear().await {
                warn!("Submitted, but failed to clear draft: {}", e);
            }
        }

        SubmitOutcome::Completed(receipt)
    }

    fn transition(&self, progress: Progress) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .progress = progress;
        info!("Submission progress: {:?} ({})", progress, progress.label());
        // No subscribers is fine
        let _ = self.events.send(progress);
    }

    fn fail(&self, step: &str, error: OnboardError) -> SubmitOutcome {
        let message = format!("Failed to save {}: {}", step, error);
        warn!("{}", message);
        self.abort(message.clone());
        SubmitOutcome::Failed(message)
    }

    fn abort(&self, message: String) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.progress = Progress::Ready;
            state.is_submitting = false;
            state.last_error = Some(message);
        }
        let _ = self.events.send(Progress::Ready);
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Restores READY if the submit future is dropped mid-sequence
struct AttemptGuard<'a> {
    pipeline: &'a SubmissionPipeline,
    finished: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Submission interrupted before completion");
            self.pipeline.abort("Submission interrupted".to_string());
        }
    }
}
