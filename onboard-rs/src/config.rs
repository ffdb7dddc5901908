//! Configuration for onboard-rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{OnboardError, Result};

/// Main onboarding configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OnboardConfig {
    /// Backend endpoints
    #[serde(default)]
    pub api: ApiConfig,
    /// Typeahead behaviour
    #[serde(default)]
    pub search: SearchConfig,
    /// Submission pipeline
    #[serde(default)]
    pub submission: SubmissionConfig,
    /// Local draft persistence
    #[serde(default)]
    pub draft: DraftConfig,
    /// Photo constraints
    #[serde(default)]
    pub photo: PhotoConfig,
}

/// Backend endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Service owning departments and basic info (e.g., "http://localhost:4001")
    #[serde(default = "default_basic_info_base_url")]
    pub basic_info_base_url: String,
    /// Service owning locations and detail info (e.g., "http://localhost:4002")
    #[serde(default = "default_details_base_url")]
    pub details_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Typeahead configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Minimum trimmed query length before any request is made
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    /// Debounce window in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub debounce_ms: u64,
}

/// Submission pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionConfig {
    /// Settle delay spent in the VERIFYING state
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Draft persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DraftConfig {
    /// Directory holding one JSON file per draft key
    #[serde(default = "default_draft_dir")]
    pub dir: PathBuf,
    /// Write-behind delay in milliseconds
    #[serde(default = "default_draft_debounce_ms")]
    pub debounce_ms: u64,
}

/// Photo picker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhotoConfig {
    /// Maximum accepted file size in megabytes
    #[serde(default = "default_photo_max_mb")]
    pub max_size_mb: u64,
}

fn default_basic_info_base_url() -> String {
    "http://localhost:4001".to_string()
}

fn default_details_base_url() -> String {
    "http://localhost:4002".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_min_chars() -> usize {
    1
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_settle_delay_ms() -> u64 {
    600
}

fn default_draft_dir() -> PathBuf {
    std::env::temp_dir().join("onboard-drafts")
}

fn default_draft_debounce_ms() -> u64 {
    2000
}

fn default_photo_max_mb() -> u64 {
    2
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            basic_info_base_url: default_basic_info_base_url(),
            details_base_url: default_details_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            dir: default_draft_dir(),
            debounce_ms: default_draft_debounce_ms(),
        }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            max_size_mb: default_photo_max_mb(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl SubmissionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl DraftConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl OnboardConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OnboardError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| OnboardError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Layer an optional TOML file under `ONBOARD__SECTION__KEY` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("ONBOARD")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| OnboardError::Config(format!("Failed to load config: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| OnboardError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default development configuration (json-server on ports 4001/4002)
    pub fn development() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for base in [&self.api.basic_info_base_url, &self.api.details_base_url] {
            url::Url::parse(base).map_err(|e| {
                OnboardError::Config(format!("Invalid base URL '{}': {}", base, e))
            })?;
        }

        if self.api.timeout_seconds == 0 {
            return Err(OnboardError::Config("api.timeout_seconds must be > 0".to_string()));
        }

        if self.photo.max_size_mb == 0 {
            return Err(OnboardError::Config("photo.max_size_mb must be > 0".to_string()));
        }

        Ok(())
    }
}
