//! Mock backend for testing
//!
//! Routes are matched in registration order on method, URL and a subset of
//! query parameters. One-shot routes are removed after their first use, which
//! makes "fail once, then succeed" scripts easy to express.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{ApiResponse, HttpBackend};
use crate::error::{OnboardError, Result};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Scripted reply
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: std::result::Result<ApiResponse, MockFailure>,
    delay: Duration,
}

#[derive(Debug, Clone)]
enum MockFailure {
    Status(u16, String),
    Transport(String),
}

impl MockReply {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            outcome: Ok(ApiResponse::json(body)),
            delay: Duration::ZERO,
        }
    }

    pub fn paginated(body: serde_json::Value, total_count: u64) -> Self {
        Self {
            outcome: Ok(ApiResponse {
                body,
                total_count: Some(total_count),
            }),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            outcome: Err(MockFailure::Status(status, body.to_string())),
            delay: Duration::ZERO,
        }
    }

    pub fn transport_error(message: &str) -> Self {
        Self {
            outcome: Err(MockFailure::Transport(message.to_string())),
            delay: Duration::ZERO,
        }
    }

    /// Delay the reply, simulating a slow backend
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct MockRoute {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    reply: MockReply,
    once: bool,
}

impl MockRoute {
    fn matches(&self, method: Method, url: &str, query: &[(String, String)]) -> bool {
        self.method == method
            && self.url == url
            && self.query.iter().all(|pair| query.contains(pair))
    }
}

/// A request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RecordedRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Scriptable in-memory backend
#[derive(Default)]
pub struct MockBackend {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply for `method url` when all `query` pairs are present
    pub fn route(&self, method: Method, url: &str, query: &[(&str, &str)], reply: MockReply) {
        self.push(method, url, query, reply, false);
    }

    /// Like [`MockBackend::route`] but consumed by its first match
    pub fn route_once(&self, method: Method, url: &str, query: &[(&str, &str)], reply: MockReply) {
        self.push(method, url, query, reply, true);
    }

    pub fn on_get(&self, url: &str, body: serde_json::Value) {
        self.route(Method::Get, url, &[], MockReply::json(body));
    }

    pub fn on_post(&self, url: &str, body: serde_json::Value) {
        self.route(Method::Post, url, &[], MockReply::json(body));
    }

    fn push(&self, method: Method, url: &str, query: &[(&str, &str)], reply: MockReply, once: bool) {
        let route = MockRoute {
            method,
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            reply,
            once,
        };
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }

    /// All requests issued so far, in issue order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests matching `method url`
    pub fn requests_to(&self, method: Method, url: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url == url)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                method,
                url: url.to_string(),
                query: query.to_vec(),
                body: body.cloned(),
            });

        let reply = {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            let index = routes.iter().position(|r| r.matches(method, url, query));
            match index {
                Some(i) if routes[i].once => Some(routes.remove(i).reply),
                Some(i) => Some(routes[i].reply.clone()),
                None => None,
            }
        };

        let Some(reply) = reply else {
            debug!("MockBackend: no route for {:?} {}", method, url);
            return Err(OnboardError::Status {
                status: 404,
                body: format!("no route for {}", url),
            });
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        match reply.outcome {
            Ok(response) => Ok(response),
            Err(MockFailure::Status(status, body)) => Err(OnboardError::Status { status, body }),
            Err(MockFailure::Transport(message)) => Err(OnboardError::Http(message)),
        }
    }
}

#[async_trait]
impl HttpBackend for MockBackend {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        self.dispatch(Method::Get, url, query, None).await
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        self.dispatch(Method::Post, url, &[], Some(body)).await
    }
}
