//! Wizard role
//!
//! Only a branching hint: admins fill contact info first, ops jump straight
//! to the detail step. Nothing here is an access check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OnboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Ops,
}

impl Role {
    /// Read `role` from a URL query string (`?role=admin`); anything else is ops
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "role")
            .map(|(_, value)| {
                if value.eq_ignore_ascii_case("admin") {
                    Role::Admin
                } else {
                    Role::Ops
                }
            })
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Ops => "ops",
        }
    }

    /// Storage key of this role's draft
    pub fn draft_key(&self) -> String {
        format!("draft_{}", self.as_str())
    }

    /// Whether this role fills the contact-info step
    pub fn fills_contact_step(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "ops" => Ok(Role::Ops),
            other => Err(OnboardError::Validation(format!("Unknown role: {}", other))),
        }
    }
}
