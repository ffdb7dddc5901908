//! Wizard coordinator
//!
//! Ties the two pickers, the identifier tracker, the photo picker, the draft
//! store and the submission pipeline to one form. Role only decides where the
//! wizard starts and whether the contact step exists.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::api::{Department, Location, OnboardApi};
use crate::config::OnboardConfig;
use crate::draft::{
    ContactInfo, DetailSelection, DraftPatch, DraftStorage, DraftStore, EmployeeDraft,
};
use crate::employee_id::EmployeeIdTracker;
use crate::error::Result;
use crate::photo::PhotoPicker;
use crate::role::Role;
use crate::search::{department_search, location_search, Key, SearchEngine};
use crate::submission::{Progress, SubmissionPipeline, SubmissionState, SubmitOutcome};
use crate::validation::{validate_contact, FieldErrors};

/// Wizard page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Contact = 1,
    Details = 2,
}

impl Step {
    pub fn initial(role: Role) -> Self {
        if role.fills_contact_step() {
            Step::Contact
        } else {
            Step::Details
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }
}

pub struct Wizard {
    role: Role,
    step: Mutex<Step>,
    form: Mutex<EmployeeDraft>,
    photo: Mutex<PhotoPicker>,
    drafts: Arc<DraftStore>,
    departments: SearchEngine<Department>,
    locations: SearchEngine<Location>,
    employee_id: EmployeeIdTracker,
    pipeline: SubmissionPipeline,
}

impl Wizard {
    /// Wizard for `role`, persisting its draft under `draft_key`
    pub fn new(
        api: OnboardApi,
        role: Role,
        draft_key: impl Into<String>,
        storage: Arc<dyn DraftStorage>,
        config: &OnboardConfig,
    ) -> Self {
        let drafts = Arc::new(DraftStore::new(storage, draft_key, config.draft.debounce()));
        let pipeline = SubmissionPipeline::new(api.clone(), role, &config.submission)
            .with_draft_store(drafts.clone());

        Self {
            role,
            step: Mutex::new(Step::initial(role)),
            form: Mutex::new(EmployeeDraft::default()),
            photo: Mutex::new(PhotoPicker::new(config.photo.max_size_mb)),
            drafts,
            departments: department_search(&api, &config.search),
            locations: location_search(&api, &config.search),
            employee_id: EmployeeIdTracker::new(api),
            pipeline,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn step(&self) -> Step {
        *self.step.lock().await
    }

    pub fn is_back_visible_on(&self, step: Step) -> bool {
        self.role.fills_contact_step() && step > Step::Contact
    }

    pub fn departments(&self) -> &SearchEngine<Department> {
        &self.departments
    }

    pub fn locations(&self) -> &SearchEngine<Location> {
        &self.locations
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    /// Current form contents
    pub async fn form(&self) -> EmployeeDraft {
        self.form.lock().await.clone()
    }

    /// Load the persisted draft into the form and mirror it into the pickers
    pub async fn restore(&self) -> Result<EmployeeDraft> {
        let stored = self.drafts.load().await?.unwrap_or_default();

        self.departments
            .sync_value(stored.step2.department.as_ref())
            .await;
        self.locations.sync_value(stored.step2.location.as_ref()).await;
        {
            let mut photo = self.photo.lock().await;
            *photo = photo.clone().with_value(stored.step2.photo_data_url.clone());
        }

        *self.form.lock().await = stored.clone();
        *self.step.lock().await = Step::initial(self.role);
        debug!("Restored draft '{}'", self.drafts.key());
        Ok(stored)
    }

    pub async fn update_contact(&self, contact: ContactInfo) -> Result<()> {
        self.form.lock().await.step1 = contact.clone();
        self.drafts.save(DraftPatch::step1(contact)).await?;
        Ok(())
    }

    /// Leave the contact step; blocked while any contact field is invalid
    pub async fn next(&self) -> std::result::Result<Step, FieldErrors> {
        let mut step = self.step.lock().await;
        if *step == Step::Contact {
            let errors = validate_contact(&self.form.lock().await.step1);
            if !errors.is_empty() {
                return Err(errors);
            }
            *step = Step::Details;
        }
        Ok(*step)
    }

    /// Admin only; ops stay on the detail step
    pub async fn back(&self) -> Step {
        let mut step = self.step.lock().await;
        if self.is_back_visible_on(*step) {
            *step = Step::Contact;
        }
        *step
    }

    /// Department chosen or cleared; recomputes the employee identifier
    pub async fn select_department(&self, department: Option<Department>) -> Result<String> {
        self.form.lock().await.step2.department = department.clone();

        let employee_id = self.employee_id.department_changed(department.as_ref()).await;

        let details = {
            let mut form = self.form.lock().await;
            // A newer selection owns the identifier
            if form.step2.department == department {
                form.step2.employee_id = employee_id.clone();
            }
            form.step2.clone()
        };
        self.drafts.save(DraftPatch::step2(details)).await?;
        Ok(employee_id)
    }

    pub async fn select_location(&self, location: Option<Location>) -> Result<()> {
        self.update_details(|details| details.location = location).await
    }

    pub async fn set_notes(&self, notes: impl Into<String>) -> Result<()> {
        let notes = notes.into();
        self.update_details(|details| details.notes = notes).await
    }

    /// Department clicked in the picker list; commits it to the picker and the form
    pub async fn pick_department(&self, department: Department) -> Result<String> {
        self.departments.on_select(department.clone()).await;
        self.select_department(Some(department)).await
    }

    /// Location clicked in the picker list
    pub async fn pick_location(&self, location: Location) -> Result<()> {
        self.locations.on_select(location.clone()).await;
        self.select_location(Some(location)).await
    }

    /// Route a key to the department picker, committing on `Enter`
    pub async fn department_key(&self, key: Key) -> Result<Option<Department>> {
        let Some(department) = self.departments.on_key(key).await else {
            return Ok(None);
        };
        self.select_department(Some(department.clone())).await?;
        Ok(Some(department))
    }

    /// Route a key to the location picker, committing on `Enter`
    pub async fn location_key(&self, key: Key) -> Result<Option<Location>> {
        let Some(location) = self.locations.on_key(key).await else {
            return Ok(None);
        };
        self.select_location(Some(location.clone())).await?;
        Ok(Some(location))
    }

    /// Accept a photo; a rejection keeps the previous one
    pub async fn choose_photo(&self, mime_type: &str, bytes: &[u8]) -> Result<()> {
        let encoded = self.photo.lock().await.select(mime_type, bytes)?.to_string();
        self.update_details(|details| details.photo_data_url = Some(encoded))
            .await
    }

    pub async fn choose_photo_file(&self, path: &Path) -> Result<()> {
        let encoded = self.photo.lock().await.select_file(path).await?.to_string();
        self.update_details(|details| details.photo_data_url = Some(encoded))
            .await
    }

    pub async fn remove_photo(&self) -> Result<()> {
        self.photo.lock().await.remove();
        self.update_details(|details| details.photo_data_url = None)
            .await
    }

    pub async fn photo_error(&self) -> Option<String> {
        self.photo.lock().await.error().map(str::to_string)
    }

    /// Identifier field text, "Computing..." while a count is in flight
    pub async fn employee_id_display(&self) -> String {
        self.employee_id.display().await
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.pipeline.state()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<Progress> {
        self.pipeline.subscribe()
    }

    /// Submit the form; on success the wizard starts over empty
    pub async fn submit(&self) -> SubmitOutcome {
        let form = self.form().await;
        let outcome = self.pipeline.submit(&form).await;

        if let SubmitOutcome::Completed(receipt) = &outcome {
            info!("Wizard submitted employee {}", receipt.employee_id);
            self.reset_form().await;
            self.pipeline.reset();
        }
        outcome
    }

    /// Delete the persisted draft and start over
    pub async fn clear_draft(&self) -> Result<()> {
        self.drafts.clear().await?;
        self.reset_form().await;
        Ok(())
    }

    /// Stop pickers and write any pending draft
    pub async fn shutdown(&self) -> Result<()> {
        self.departments.shutdown().await;
        self.locations.shutdown().await;
        self.drafts.flush().await
    }

    async fn update_details<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DetailSelection),
    {
        let details = {
            let mut form = self.form.lock().await;
            apply(&mut form.step2);
            form.step2.clone()
        };
        self.drafts.save(DraftPatch::step2(details)).await?;
        Ok(())
    }

    async fn reset_form(&self) {
        *self.form.lock().await = EmployeeDraft::default();
        *self.step.lock().await = Step::initial(self.role);
        self.photo.lock().await.remove();
        self.departments.sync_value(None).await;
        self.locations.sync_value(None).await;
        self.employee_id.department_changed(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockBackend, OptionId};
    use crate::draft::MemoryStorage;
    use serde_json::json;
    use std::time::Duration;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];

    fn wizard(role: Role, mock: Arc<MockBackend>, storage: Arc<MemoryStorage>) -> Wizard {
        let config = OnboardConfig::development();
        let api = OnboardApi::new(mock, &config.api);
        Wizard::new(api, role, role.draft_key(), storage, &config)
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            full_name: "Anya Zahra".to_string(),
            email: "anya@example.com".to_string(),
            phone: "0812345678".to_string(),
            emergency_contact: "Budi 08123".to_string(),
        }
    }

    fn engineering() -> Department {
        Department {
            id: OptionId::Number(3),
            name: "Engineering".to_string(),
            head: None,
        }
    }

    fn jakarta() -> Location {
        Location {
            id: OptionId::from("jkt"),
            city: "Jakarta".to_string(),
            country: "Indonesia".to_string(),
        }
    }

    #[tokio::test]
    async fn test_admin_steps() {
        let w = wizard(Role::Admin, Arc::new(MockBackend::new()), Arc::new(MemoryStorage::new()));
        assert_eq!(w.step().await, Step::Contact);

        let errors = w.next().await.unwrap_err();
        assert!(!errors.is_empty());
        assert_eq!(w.step().await, Step::Contact);

        w.update_contact(contact()).await.unwrap();
        assert_eq!(w.next().await.unwrap(), Step::Details);
        assert_eq!(w.back().await, Step::Contact);
    }

    #[tokio::test]
    async fn test_ops_starts_on_details_and_cannot_go_back() {
        let w = wizard(Role::Ops, Arc::new(MockBackend::new()), Arc::new(MemoryStorage::new()));
        assert_eq!(w.step().await, Step::Details);
        assert_eq!(w.back().await, Step::Details);
        assert!(!w.is_back_visible_on(Step::Details));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_syncs_pickers_without_searching() {
        let mock = Arc::new(MockBackend::new());
        let storage = Arc::new(MemoryStorage::new());
        let mut stored = EmployeeDraft::default();
        stored.step2.department = Some(engineering());
        stored.step2.location = Some(jakarta());
        stored.step2.employee_id = "ENG-002".to_string();
        storage.write("draft_ops", &stored).await.unwrap();

        let w = wizard(Role::Ops, mock.clone(), storage);
        let restored = w.restore().await.unwrap();
        assert_eq!(restored, stored);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(w.departments().input_text().await, "Engineering");
        assert_eq!(w.locations().input_text().await, "Jakarta");
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_department_sets_identifier_and_saves() {
        let mock = Arc::new(MockBackend::new());
        mock.on_get("http://localhost:4001/basicInfo", json!([{"id": "x"}]));
        let storage = Arc::new(MemoryStorage::new());
        let w = wizard(Role::Ops, mock, storage.clone());

        let id = w.select_department(Some(engineering())).await.unwrap();
        assert_eq!(id, "EXX-002");
        assert_eq!(w.form().await.step2.employee_id, "EXX-002");

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let saved = storage.read("draft_ops").await.unwrap().unwrap();
        assert_eq!(saved.step2.employee_id, "EXX-002");

        w.select_department(None).await.unwrap();
        assert_eq!(w.form().await.step2.employee_id, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clicked_option_updates_form_and_identifier() {
        let mock = Arc::new(MockBackend::new());
        mock.on_get("http://localhost:4001/basicInfo", json!([]));
        let storage = Arc::new(MemoryStorage::new());
        let w = wizard(Role::Ops, mock, storage.clone());

        let id = w.pick_department(engineering()).await.unwrap();
        assert_eq!(id, "EXX-001");
        w.pick_location(jakarta()).await.unwrap();

        let form = w.form().await;
        assert_eq!(form.step2.department, Some(engineering()));
        assert_eq!(form.step2.employee_id, "EXX-001");
        assert_eq!(form.step2.location, Some(jakarta()));
        assert_eq!(w.departments().input_text().await, "Engineering");
        assert_eq!(w.locations().input_text().await, "Jakarta");
        assert!(!w.departments().snapshot().await.is_open);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let saved = storage.read("draft_ops").await.unwrap().unwrap();
        assert_eq!(saved.step2.employee_id, "EXX-001");
        assert_eq!(saved.step2.location, Some(jakarta()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_resets_form() {
        let mock = Arc::new(MockBackend::new());
        mock.on_get("http://localhost:4001/basicInfo", json!([]));
        mock.on_post("http://localhost:4001/basicInfo", json!({}));
        mock.on_post("http://localhost:4002/details", json!({}));
        let storage = Arc::new(MemoryStorage::new());
        let w = wizard(Role::Ops, mock.clone(), storage.clone());

        w.select_department(Some(engineering())).await.unwrap();
        w.select_location(Some(jakarta())).await.unwrap();
        w.choose_photo("image/png", PNG).await.unwrap();
        w.set_notes("starts Monday").await.unwrap();

        let outcome = w.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));

        let posted = mock.requests_to(Method::Post, "http://localhost:4001/basicInfo");
        assert_eq!(posted[0].body.as_ref().unwrap()["employeeId"], "EXX-001");

        assert!(w.form().await.is_empty());
        assert_eq!(w.step().await, Step::Details);
        assert_eq!(w.submission_state().progress, Progress::Ready);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(storage.read("draft_ops").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejected_photo_keeps_form_value() {
        let w = wizard(Role::Ops, Arc::new(MockBackend::new()), Arc::new(MemoryStorage::new()));
        w.choose_photo("image/png", PNG).await.unwrap();
        assert!(w.choose_photo("image/gif", b"GIF8").await.is_err());

        assert!(w.photo_error().await.is_some());
        assert_eq!(
            w.form().await.step2.photo_data_url.as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );

        w.remove_photo().await.unwrap();
        assert!(w.form().await.step2.photo_data_url.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_draft() {
        let storage = Arc::new(MemoryStorage::new());
        let w = wizard(Role::Admin, Arc::new(MockBackend::new()), storage.clone());
        w.update_contact(contact()).await.unwrap();
        w.next().await.unwrap();

        w.clear_draft().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(w.form().await.is_empty());
        assert_eq!(w.step().await, Step::Contact);
        assert_eq!(storage.read("draft_admin").await.unwrap(), None);
    }
}
