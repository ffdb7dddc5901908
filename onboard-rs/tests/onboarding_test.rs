//! Integration tests against an in-process json-server emulator

mod support;

use onboard_rs::api::{Department, Location, OnboardApi, OptionId};
use onboard_rs::draft::{DraftStorage, EmployeeDraft, FileStorage};
use onboard_rs::employee_id::EmployeeIdTracker;
use onboard_rs::employees::fetch_employees;
use onboard_rs::search::{ListView, SearchEngine, SearchOption};
use onboard_rs::submission::Progress;
use onboard_rs::{OnboardError, Role, SubmissionPipeline, SubmitOutcome, Wizard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::JsonServer;

fn departments(api: &OnboardApi) -> SearchEngine<Department> {
    SearchEngine::builder(api.clone(), api.departments_url(), "name")
        .min_chars(1)
        .debounce(Duration::from_millis(20))
        .build()
}

/// Poll until the engine has settled on a non-loading state
async fn wait_idle<T: SearchOption>(engine: &SearchEngine<T>) {
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if engine.list_view().await != ListView::Loading {
            return;
        }
    }
    panic!("search never settled");
}

fn labels<T: SearchOption>(options: &[T]) -> Vec<String> {
    options.iter().map(|o| o.label().to_string()).collect()
}

fn complete_draft() -> EmployeeDraft {
    let mut draft = EmployeeDraft::default();
    draft.step1.full_name = "Anya Zahra".to_string();
    draft.step1.email = "anya@example.com".to_string();
    draft.step1.phone = "081234567890".to_string();
    draft.step1.emergency_contact = "Budi 0812".to_string();
    draft.step2.department = Some(Department {
        id: OptionId::Number(1),
        name: "Human Resources".to_string(),
        head: Some("Sari".to_string()),
    });
    draft.step2.location = Some(Location {
        id: OptionId::from("jkt"),
        city: "Jakarta".to_string(),
        country: "Indonesia".to_string(),
    });
    draft.step2.employee_id = "HRX-001".to_string();
    draft.step2.photo_data_url = Some("data:image/png;base64,iVBORw==".to_string());
    draft
}

#[tokio::test]
async fn test_search_departments() {
    let server = JsonServer::start().await;
    let engine = departments(&server.api());

    engine.on_query_change("eng").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    wait_idle(&engine).await;

    let state = engine.snapshot().await;
    assert_eq!(labels(&state.options), vec!["Engineering"]);
    assert!(state.is_open);
    assert_eq!(state.highlighted_index, Some(0));
}

#[tokio::test]
async fn test_search_no_results() {
    let server = JsonServer::start().await;
    let engine = departments(&server.api());

    engine.on_query_change("zzz").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    wait_idle(&engine).await;

    assert_eq!(engine.list_view().await, ListView::NoResults);
    assert!(!engine.snapshot().await.is_open);
}

#[tokio::test]
async fn test_slow_superseded_search_is_dropped() {
    let server = JsonServer::start().await;
    server.delay_like("en", Duration::from_millis(400));
    let engine = departments(&server.api());

    engine.on_query_change("en").await;
    // Timer fired; the slow request is in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.list_view().await, ListView::Loading);

    engine.on_query_change("eng").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    wait_idle(&engine).await;
    assert_eq!(labels(&engine.snapshot().await.options), vec!["Engineering"]);

    // Past the point where the slow response would have landed
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(labels(&engine.snapshot().await.options), vec!["Engineering"]);
}

#[tokio::test]
async fn test_employee_id_counts_existing_records() {
    let server = JsonServer::start().await;
    server.seed(
        "basicInfo",
        json!([
            {"id": "a", "departmentId": 1},
            {"id": "b", "departmentId": 1},
            {"id": "c", "departmentId": 2},
            {"id": "d", "departmentId": 1},
            {"id": "e", "departmentId": 1}
        ]),
    );
    let tracker = EmployeeIdTracker::new(server.api());

    let hr = Department {
        id: OptionId::Number(1),
        name: "Human Resources".to_string(),
        head: None,
    };
    assert_eq!(tracker.department_changed(Some(&hr)).await, "HRX-005");

    let legal = Department {
        id: OptionId::Number(4),
        name: "Legal".to_string(),
        head: None,
    };
    assert_eq!(tracker.department_changed(Some(&legal)).await, "LXX-001");
}

#[tokio::test]
async fn test_submission_writes_both_records_then_lists_them() {
    let server = JsonServer::start().await;
    let config = server.config();
    let pipeline = SubmissionPipeline::new(server.api(), Role::Admin, &config.submission);
    let mut progress = pipeline.subscribe();

    let outcome = pipeline.submit(&complete_draft()).await;
    assert!(matches!(outcome, SubmitOutcome::Completed(_)));

    let mut seen = Vec::new();
    while let Ok(step) = progress.try_recv() {
        seen.push(step);
    }
    assert_eq!(
        seen,
        vec![Progress::StepASent, Progress::StepBSent, Progress::Verifying, Progress::Done]
    );

    let basic = server.rows("basicInfo");
    let details = server.rows("details");
    assert_eq!(basic.len(), 1);
    assert_eq!(details.len(), 1);
    assert_eq!(basic[0]["employeeId"], details[0]["employeeId"]);
    assert_eq!(basic[0]["departmentId"], 1);

    let page = fetch_employees(&server.api(), 1, 10).await.unwrap();
    assert_eq!(page.total, 1);
    let record = &page.records[0];
    assert_eq!(record.employee_id, "HRX-001");
    assert_eq!(record.full_name, "Anya Zahra");
    assert_eq!(record.department, "Human Resources");
    assert_eq!(record.role, "admin");
    assert_eq!(record.location, "Jakarta");
}

#[tokio::test]
async fn test_failed_detail_write_then_full_retry() {
    let server = JsonServer::start().await;
    server.fail_next_posts("details", 1);
    let config = server.config();
    let pipeline = SubmissionPipeline::new(server.api(), Role::Admin, &config.submission);
    let draft = complete_draft();

    let outcome = pipeline.submit(&draft).await;
    let SubmitOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(message.contains("500"));
    let state = pipeline.state();
    assert_eq!(state.progress, Progress::Ready);
    assert_eq!(state.last_error.as_deref(), Some(message.as_str()));
    assert_eq!(server.rows("basicInfo").len(), 1);
    assert!(server.rows("details").is_empty());

    let outcome = pipeline.retry(&draft).await;
    assert!(matches!(outcome, SubmitOutcome::Completed(_)));

    // Step A is replayed with a new id; the first record stays orphaned
    let basic = server.rows("basicInfo");
    assert_eq!(basic.len(), 2);
    assert_ne!(basic[0]["id"], basic[1]["id"]);
    assert_eq!(server.rows("details").len(), 1);
}

#[tokio::test]
async fn test_unknown_collection_is_a_status_error() {
    let server = JsonServer::start().await;
    let api = server.api();

    let url = format!("{}/nope", server.base_url);
    let err = api
        .search::<Department>(&url, "name", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, OnboardError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_wizard_restores_file_draft() {
    let server = JsonServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()));
    storage.write("draft_ops", &complete_draft()).await.unwrap();

    let config = server.config();
    let wizard = Wizard::new(server.api(), Role::Ops, "draft_ops", storage.clone(), &config);
    let restored = wizard.restore().await.unwrap();
    assert_eq!(restored.step2.employee_id, "HRX-001");
    assert_eq!(wizard.departments().input_text().await, "Human Resources");

    wizard.set_notes("badge pending").await.unwrap();
    wizard.shutdown().await.unwrap();

    let saved = storage.read("draft_ops").await.unwrap().unwrap();
    assert_eq!(saved.step2.notes, "badge pending");
    assert_eq!(saved.step1.full_name, "Anya Zahra");
}
