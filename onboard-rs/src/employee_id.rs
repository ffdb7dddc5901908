//! Derived employee identifier
//!
//! `<initials>-<sequence>`: up to three department-name initials padded with
//! `X`, then the number of existing records in the department plus one.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{Department, OnboardApi};

const PREFIX_LEN: usize = 3;
const PAD: char = 'X';

/// Build the identifier for the next employee of `department_name`
pub fn make_employee_id(department_name: &str, existing_count: usize) -> String {
    if department_name.is_empty() {
        return String::new();
    }

    let normalized: String = department_name
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { c } else { ' ' })
        .collect();

    let mut prefix: String = normalized
        .split_whitespace()
        .take(PREFIX_LEN)
        .filter_map(|word| word.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    while prefix.len() < PREFIX_LEN {
        prefix.push(PAD);
    }
    prefix.truncate(PREFIX_LEN);

    format!("{}-{:03}", prefix, existing_count + 1)
}

#[derive(Default)]
struct TrackerState {
    generation: u64,
    employee_id: String,
    is_fetching: bool,
}

/// Keeps the identifier in step with the selected department
///
/// Every department change bumps a generation; a count response is applied
/// only if no newer change happened while it was in flight.
pub struct EmployeeIdTracker {
    api: OnboardApi,
    state: Mutex<TrackerState>,
}

impl EmployeeIdTracker {
    pub fn new(api: OnboardApi) -> Self {
        Self {
            api,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Recompute after the department selection changed; returns the current identifier
    pub async fn department_changed(&self, department: Option<&Department>) -> String {
        let Some(department) = department else {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.employee_id.clear();
            state.is_fetching = false;
            return String::new();
        };

        let generation = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.is_fetching = true;
            state.generation
        };

        let counted = self.api.count_in_department(&department.id).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(
                "Ignoring stale count for department {} (gen {} < {})",
                department.id, generation, state.generation
            );
            return state.employee_id.clone();
        }

        state.is_fetching = false;
        state.employee_id = match counted {
            Ok(count) => make_employee_id(&department.name, count),
            Err(e) => {
                warn!("Failed to fetch existing count for {}: {}", department.name, e);
                String::new()
            }
        };
        state.employee_id.clone()
    }

    pub async fn current(&self) -> String {
        self.state.lock().await.employee_id.clone()
    }

    pub async fn is_fetching(&self) -> bool {
        self.state.lock().await.is_fetching
    }

    /// Text for a read-only identifier field
    pub async fn display(&self) -> String {
        let state = self.state.lock().await;
        if state.is_fetching {
            "Computing...".to_string()
        } else {
            state.employee_id.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockBackend, MockReply, OptionId};
    use crate::config::ApiConfig;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const BASIC: &str = "http://localhost:4001/basicInfo";

    fn dept(id: i64, name: &str) -> Department {
        Department {
            id: OptionId::Number(id),
            name: name.to_string(),
            head: None,
        }
    }

    #[test]
    fn test_make_employee_id() {
        assert_eq!(make_employee_id("Human Resources", 4), "HRX-005");
        assert_eq!(make_employee_id("Research and Development Lab", 0), "RAD-001");
        assert_eq!(make_employee_id("finance", 41), "FXX-042");
        assert_eq!(make_employee_id("R&D", 9), "RDX-010");
        assert_eq!(make_employee_id("", 3), "");
    }

    #[test]
    fn test_make_employee_id_without_letters() {
        assert_eq!(make_employee_id("42", 0), "XXX-001");
        assert_eq!(make_employee_id("Ops", 999), "OXX-1000");
    }

    #[tokio::test]
    async fn test_tracker_computes_and_resets() {
        let mock = Arc::new(MockBackend::new());
        mock.route(
            Method::Get,
            BASIC,
            &[("departmentId", "2")],
            MockReply::json(json!([{"id": "a"}, {"id": "b"}])),
        );
        let tracker = EmployeeIdTracker::new(OnboardApi::new(mock, &ApiConfig::default()));

        let id = tracker.department_changed(Some(&dept(2, "Customer Success"))).await;
        assert_eq!(id, "CSX-003");
        assert_eq!(tracker.current().await, "CSX-003");

        assert_eq!(tracker.department_changed(None).await, "");
        assert_eq!(tracker.current().await, "");
    }

    #[tokio::test]
    async fn test_tracker_failure_clears_id() {
        let mock = Arc::new(MockBackend::new());
        mock.route(Method::Get, BASIC, &[], MockReply::status(500, "down"));
        let tracker = EmployeeIdTracker::new(OnboardApi::new(mock, &ApiConfig::default()));

        assert_eq!(tracker.department_changed(Some(&dept(1, "Legal"))).await, "");
        assert!(!tracker.is_fetching().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_count_does_not_overwrite() {
        let mock = Arc::new(MockBackend::new());
        mock.route(
            Method::Get,
            BASIC,
            &[("departmentId", "1")],
            MockReply::json(json!([{}, {}, {}, {}])).after(Duration::from_millis(800)),
        );
        mock.route(
            Method::Get,
            BASIC,
            &[("departmentId", "2")],
            MockReply::json(json!([])).after(Duration::from_millis(50)),
        );
        let tracker = Arc::new(EmployeeIdTracker::new(OnboardApi::new(
            mock,
            &ApiConfig::default(),
        )));

        let slow = {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                let engineering = dept(1, "Engineering");
                tracker.department_changed(Some(&engineering)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tracker.display().await, "Computing...");

        let fresh = tracker.department_changed(Some(&dept(2, "Marketing"))).await;
        assert_eq!(fresh, "MXX-001");

        let stale_view = slow.await.unwrap();
        assert_eq!(stale_view, "MXX-001");
        assert_eq!(tracker.current().await, "MXX-001");
    }
}
