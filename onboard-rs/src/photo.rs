//! Photo selection
//!
//! Accepts JPEG or PNG up to a size limit and turns the bytes into a
//! `data:` URL. A rejected file leaves the previously accepted photo alone.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::error::{OnboardError, Result};

const ACCEPTED_TYPES: [&str; 2] = ["image/jpeg", "image/png"];
const DEFAULT_MAX_MB: u64 = 2;

/// Photo picker state
#[derive(Debug, Clone)]
pub struct PhotoPicker {
    max_size_mb: u64,
    value: Option<String>,
    error: Option<String>,
}

impl Default for PhotoPicker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MB)
    }
}

impl PhotoPicker {
    pub fn new(max_size_mb: u64) -> Self {
        Self {
            max_size_mb,
            value: None,
            error: None,
        }
    }

    /// Start from a previously accepted payload (e.g. a restored draft)
    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }

    /// Validate and encode a chosen file
    pub fn select(&mut self, mime_type: &str, bytes: &[u8]) -> Result<&str> {
        if let Err(e) = self.check(mime_type, bytes.len() as u64) {
            self.error = Some(e.to_string());
            return Err(e);
        }

        let encoded = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        debug!("Photo accepted ({} bytes, {})", bytes.len(), mime_type);
        self.error = None;
        Ok(self.value.insert(encoded).as_str())
    }

    /// Read `path` and select it, guessing the type from the extension
    pub async fn select_file(&mut self, path: &std::path::Path) -> Result<&str> {
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        };

        let metadata = tokio::fs::metadata(path).await?;
        if let Err(e) = self.check(mime_type, metadata.len()) {
            self.error = Some(e.to_string());
            return Err(e);
        }

        let bytes = tokio::fs::read(path).await?;
        self.select(mime_type, &bytes)
    }

    pub fn remove(&mut self) {
        self.value = None;
        self.error = None;
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Last rejection message, cleared by the next accepted file
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn check(&self, mime_type: &str, size: u64) -> Result<()> {
        if !ACCEPTED_TYPES.contains(&mime_type) {
            return Err(OnboardError::Photo("Only JPEG or PNG files are allowed.".to_string()));
        }
        if size > self.max_bytes() {
            return Err(OnboardError::Photo(format!(
                "Maximum file size is {}MB.",
                self.max_size_mb
            )));
        }
        Ok(())
    }
}
