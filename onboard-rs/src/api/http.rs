//! reqwest-backed HTTP implementation

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ApiResponse, HttpBackend};
use crate::error::{OnboardError, Result};

/// Real HTTP backend
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OnboardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn decode(response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Request failed with status {}: {}", status, error_text);
            return Err(OnboardError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let total_count = response
            .headers()
            .get("x-total-count")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(ApiResponse { body, total_count })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        debug!("GET {} {:?}", url, query);
        let response = self.client.get(url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(response).await
    }
}
