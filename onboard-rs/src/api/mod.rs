//! Remote API abstraction
//!
//! The two json-server style backends are reached through [`HttpBackend`],
//! with [`ReqwestBackend`] for real traffic and [`MockBackend`] for tests and
//! offline runs. [`OnboardApi`] layers the typed endpoints on top.

use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{OnboardError, Result};

pub mod client;
pub mod http;
pub mod mock;
pub mod types;

pub use client::OnboardApi;
pub use http::ReqwestBackend;
pub use mock::{Method, MockBackend, MockReply};
pub use types::{BasicInfoRecord, Department, DetailInfoRecord, Location, OptionId};

/// Decoded backend response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// JSON body
    pub body: serde_json::Value,
    /// `X-Total-Count` header, when the backend paginates
    pub total_count: Option<u64>,
}

impl ApiResponse {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            body,
            total_count: None,
        }
    }
}

/// Minimal HTTP surface the engines depend on
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// GET `url` with query parameters
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse>;

    /// POST a JSON body to `url`
    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<ApiResponse>;
}

/// Race `fut` against `token`; a cancelled token drops the request future
pub async fn with_cancel<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(OnboardError::Cancelled),
        res = fut => res,
    }
}
