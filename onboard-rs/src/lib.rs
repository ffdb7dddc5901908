//! onboard-rs: Employee onboarding wizard engine
//!
//! The non-visual core of a two-step onboarding wizard backed by two
//! json-server style REST services.
//!
//! # Features
//!
//! - **Typeahead search**: debounced, cancellable remote lookups with
//!   keyboard navigation ([`search::SearchEngine`])
//! - **Employee ID**: `<initials>-<sequence>` derived from the selected
//!   department ([`employee_id`])
//! - **Submission**: ordered two-write pipeline with a visible progress
//!   state machine and full-restart retry ([`submission::SubmissionPipeline`])
//! - **Drafts**: debounced, per-role draft persistence ([`draft`])
//! - **Listing**: paginated merge of both resources ([`employees`])
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! basic_info_base_url = "http://localhost:4001"
//! details_base_url = "http://localhost:4002"
//! timeout_seconds = 10
//!
//! [search]
//! min_chars = 1
//! debounce_ms = 300
//!
//! [submission]
//! settle_delay_ms = 600
//!
//! [draft]
//! dir = "/var/lib/onboard/drafts"
//! debounce_ms = 2000
//! ```

pub mod api;
pub mod config;
pub mod debounce;
pub mod draft;
pub mod employee_id;
pub mod employees;
pub mod error;
pub mod photo;
pub mod role;
pub mod search;
pub mod submission;
pub mod validation;
pub mod wizard;

pub use config::OnboardConfig;
pub use error::{OnboardError, Result};
pub use role::Role;
pub use search::SearchEngine;
pub use submission::{Progress, SubmissionPipeline, SubmitOutcome};
pub use wizard::Wizard;
