//! Typed endpoints of the two backends

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use super::types::{BasicInfoRecord, DetailInfoRecord, OptionId};
use super::{ApiResponse, HttpBackend};
use crate::config::ApiConfig;
use crate::error::Result;

/// Typed client over an [`HttpBackend`]
#[derive(Clone)]
pub struct OnboardApi {
    backend: Arc<dyn HttpBackend>,
    basic_info_base_url: String,
    details_base_url: String,
}

impl OnboardApi {
    pub fn new(backend: Arc<dyn HttpBackend>, config: &ApiConfig) -> Self {
        Self {
            backend,
            basic_info_base_url: config.basic_info_base_url.trim_end_matches('/').to_string(),
            details_base_url: config.details_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn backend(&self) -> Arc<dyn HttpBackend> {
        self.backend.clone()
    }

    pub fn departments_url(&self) -> String {
        format!("{}/departments", self.basic_info_base_url)
    }

    pub fn basic_info_url(&self) -> String {
        format!("{}/basicInfo", self.basic_info_base_url)
    }

    pub fn locations_url(&self) -> String {
        format!("{}/locations", self.details_base_url)
    }

    pub fn details_url(&self) -> String {
        format!("{}/details", self.details_base_url)
    }

    /// `GET <endpoint>?<field>_like=<text>`
    pub async fn search<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        field: &str,
        text: &str,
    ) -> Result<Vec<T>> {
        let query = vec![(format!("{}_like", field), text.to_string())];
        let response = self.backend.get(endpoint, &query).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    /// Number of basic-info records already filed under `department_id`
    pub async fn count_in_department(&self, department_id: &OptionId) -> Result<usize> {
        let query = vec![("departmentId".to_string(), department_id.to_string())];
        let response = self.backend.get(&self.basic_info_url(), &query).await?;

        // Anything other than an array counts as empty
        let count = response.body.as_array().map(|a| a.len()).unwrap_or(0);
        debug!("Department {} has {} existing records", department_id, count);
        Ok(count)
    }

    /// Write A
    pub async fn post_basic_info(&self, record: &BasicInfoRecord) -> Result<serde_json::Value> {
        let body = serde_json::to_value(record)?;
        let response = self.backend.post(&self.basic_info_url(), &body).await?;
        Ok(response.body)
    }

    /// Write B
    pub async fn post_detail_info(&self, record: &DetailInfoRecord) -> Result<serde_json::Value> {
        let body = serde_json::to_value(record)?;
        let response = self.backend.post(&self.details_url(), &body).await?;
        Ok(response.body)
    }

    pub async fn list_basic_info(&self, page: u32, limit: u32) -> Result<ApiResponse> {
        self.backend
            .get(&self.basic_info_url(), &page_query(page, limit))
            .await
    }

    pub async fn list_details(&self, page: u32, limit: u32) -> Result<ApiResponse> {
        self.backend
            .get(&self.details_url(), &page_query(page, limit))
            .await
    }
}

fn page_query(page: u32, limit: u32) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if page > 0 {
        query.push(("_page".to_string(), page.to_string()));
    }
    if limit > 0 {
        query.push(("_limit".to_string(), limit.to_string()));
    }
    query
}
