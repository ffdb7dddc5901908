//! Wire types shared with the two backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record identifier; json-server hands out numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionId::Number(n) => write!(f, "{}", n),
            OptionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for OptionId {
    fn from(value: i64) -> Self {
        OptionId::Number(value)
    }
}

impl From<&str> for OptionId {
    fn from(value: &str) -> Self {
        OptionId::Text(value.to_string())
    }
}

/// Department, served by the basic-info service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: OptionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
}

/// Location, served by the details service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: OptionId,
    pub city: String,
    #[serde(default)]
    pub country: String,
}

/// Body of write A
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfoRecord {
    pub id: String,
    pub employee_id: String,
    pub department_id: OptionId,
    pub department: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub phone: String,
    pub emergency_contact: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Body of write B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailInfoRecord {
    pub id: String,
    pub employee_id: String,
    pub location_id: OptionId,
    pub location: String,
    pub photo: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}
