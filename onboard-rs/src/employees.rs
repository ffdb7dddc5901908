//! Paginated employee listing
//!
//! Both resources are fetched for the same page and joined on `employeeId`.
//! The basic-info side drives the listing; details are optional.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::api::{OnboardApi, OptionId};
use crate::error::Result;

const MISSING: &str = "-";
const NO_LOCATION: &str = "N/A";
const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BasicListing {
    id: Option<OptionId>,
    employee_id: Option<String>,
    full_name: Option<String>,
    department: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailListing {
    employee_id: Option<String>,
    location_id: Option<OptionId>,
    location: Option<String>,
    photo: Option<String>,
}

/// One row of the employee table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub full_name: String,
    pub department: String,
    pub role: String,
    pub location: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeePage {
    pub records: Vec<EmployeeRecord>,
    pub total: u64,
}

/// Pager state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self { page, limit, total }
    }

    /// Never less than one
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 1;
        }
        self.total.div_ceil(u64::from(self.limit)).max(1)
    }

    pub fn can_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Fetch and join one page of employees
pub async fn fetch_employees(api: &OnboardApi, page: u32, limit: u32) -> Result<EmployeePage> {
    let (basic, details) = tokio::try_join!(api.list_basic_info(page, limit), api.list_details(page, limit))?;

    let basic_rows: Vec<BasicListing> = serde_json::from_value(basic.body)?;
    let detail_rows: Vec<DetailListing> = serde_json::from_value(details.body)?;

    let total = basic
        .total_count
        .filter(|count| *count > 0)
        .unwrap_or(basic_rows.len() as u64);

    let records = merge(basic_rows, detail_rows);
    debug!("Fetched {} employees (page {}, total {})", records.len(), page, total);
    Ok(EmployeePage { records, total })
}

fn merge(basic_rows: Vec<BasicListing>, detail_rows: Vec<DetailListing>) -> Vec<EmployeeRecord> {
    // Later details win for duplicate ids
    let mut details: HashMap<String, DetailListing> = HashMap::new();
    for detail in detail_rows {
        if let Some(key) = detail.employee_id.clone().filter(|k| !k.is_empty()) {
            details.insert(key, detail);
        }
    }

    basic_rows
        .into_iter()
        .map(|basic| {
            let employee_id = basic
                .employee_id
                .or_else(|| basic.id.map(|id| id.to_string()))
                .unwrap_or_default();
            let detail = details.get(&employee_id);

            let location = detail
                .and_then(|d| {
                    d.location
                        .clone()
                        .or_else(|| d.location_id.as_ref().map(|id| id.to_string()))
                })
                .unwrap_or_else(|| NO_LOCATION.to_string());

            EmployeeRecord {
                full_name: basic.full_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                department: non_empty_or_dash(basic.department),
                role: non_empty_or_dash(basic.role),
                location,
                photo: detail.and_then(|d| d.photo.clone()),
                employee_id,
            }
        })
        .collect()
}

fn non_empty_or_dash(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}
