//! Local, per-field form validation

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::draft::{ContactInfo, DetailSelection, EmployeeDraft};
use crate::role::Role;

const MIN_PHONE_LEN: usize = 9;

/// Form field carrying an inline error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FullName,
    Email,
    Phone,
    EmergencyContact,
    Department,
    Location,
    EmployeeId,
    Photo,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::EmergencyContact => "emergencyContact",
            Field::Department => "department",
            Field::Location => "location",
            Field::EmployeeId => "employeeId",
            Field::Photo => "photo",
        };
        f.write_str(name)
    }
}

/// Errors keyed by field; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    fn add(&mut self, field: Field, message: &str) {
        self.0.insert(field, message.to_string());
    }

    fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

pub fn validate_contact(contact: &ContactInfo) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if contact.full_name.trim().is_empty() {
        errors.add(Field::FullName, "Full name is required.");
    }

    let email = contact.email.trim();
    if email.is_empty() {
        errors.add(Field::Email, "Email is required.");
    } else if !email.contains('@') {
        errors.add(Field::Email, "Email address is not valid.");
    }

    let phone = contact.phone.trim();
    if phone.chars().count() < MIN_PHONE_LEN {
        errors.add(Field::Phone, "Phone number needs at least 9 characters.");
    } else if !phone.chars().all(|c| c.is_ascii_digit()) {
        errors.add(Field::Phone, "Only digits are allowed.");
    }

    if contact.emergency_contact.trim().is_empty() {
        errors.add(Field::EmergencyContact, "Emergency contact is required.");
    }

    errors
}

pub fn validate_details(details: &DetailSelection) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if details.department.is_none() {
        errors.add(Field::Department, "Please choose a department.");
    }
    if details.location.is_none() {
        errors.add(Field::Location, "Please choose a location.");
    }
    if details.employee_id.is_empty() {
        errors.add(Field::EmployeeId, "Employee ID has not been generated yet.");
    }
    if details.photo_data_url.as_deref().map(str::is_empty).unwrap_or(true) {
        errors.add(Field::Photo, "A photo is required.");
    }

    errors
}

/// Everything `role` must have filled before submitting
pub fn validate_draft(draft: &EmployeeDraft, role: Role) -> FieldErrors {
    let mut errors = validate_details(&draft.step2);
    if role.fills_contact_step() {
        errors.extend(validate_contact(&draft.step1));
    }
    errors
}
