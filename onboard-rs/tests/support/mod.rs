//! In-process json-server emulator
//!
//! Serves `GET /:collection` (field equality, `<field>_like` substring,
//! `_page`/`_limit` with `X-Total-Count`) and `POST /:collection` on a random
//! local port. Both onboarding backends are pointed at the same instance.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use onboard_rs::api::{OnboardApi, ReqwestBackend};
use onboard_rs::OnboardConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Db {
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    failing_posts: Arc<Mutex<HashMap<String, usize>>>,
    slow_likes: Arc<Mutex<HashMap<String, Duration>>>,
}

pub struct JsonServer {
    pub base_url: String,
    db: Db,
}

impl JsonServer {
    /// Start with the usual departments and locations and empty record collections
    pub async fn start() -> Self {
        let db = Db::default();
        {
            let mut collections = db.collections.lock().unwrap();
            collections.insert(
                "departments".to_string(),
                json!([
                    {"id": 1, "name": "Human Resources", "head": "Sari"},
                    {"id": 2, "name": "Engineering", "head": "Rina"},
                    {"id": 3, "name": "Energy Trading"},
                    {"id": 4, "name": "Legal"}
                ])
                .as_array()
                .unwrap()
                .clone(),
            );
            collections.insert(
                "locations".to_string(),
                json!([
                    {"id": "jkt", "city": "Jakarta", "country": "Indonesia"},
                    {"id": "sby", "city": "Surabaya", "country": "Indonesia"},
                    {"id": "sg", "city": "Singapore", "country": "Singapore"}
                ])
                .as_array()
                .unwrap()
                .clone(),
            );
            collections.insert("basicInfo".to_string(), Vec::new());
            collections.insert("details".to_string(), Vec::new());
        }

        let app = Router::new()
            .route("/:collection", get(list).post(create))
            .with_state(db.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            db,
        }
    }

    pub fn seed(&self, collection: &str, rows: Value) {
        let rows = rows.as_array().cloned().unwrap_or_default();
        self.db
            .collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.db
            .collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Answer the next `count` POSTs to `collection` with a 500
    pub fn fail_next_posts(&self, collection: &str, count: usize) {
        self.db
            .failing_posts
            .lock()
            .unwrap()
            .insert(collection.to_string(), count);
    }

    /// Delay any `_like` search for exactly `text`
    pub fn delay_like(&self, text: &str, delay: Duration) {
        self.db
            .slow_likes
            .lock()
            .unwrap()
            .insert(text.to_string(), delay);
    }

    /// Config pointing both backends here, with short timers
    pub fn config(&self) -> OnboardConfig {
        let mut config = OnboardConfig::development();
        config.api.basic_info_base_url = self.base_url.clone();
        config.api.details_base_url = self.base_url.clone();
        config.search.debounce_ms = 20;
        config.submission.settle_delay_ms = 10;
        config.draft.debounce_ms = 20;
        config
    }

    pub fn api(&self) -> OnboardApi {
        let config = self.config();
        let backend = ReqwestBackend::new(Duration::from_secs(5)).unwrap();
        OnboardApi::new(Arc::new(backend), &config.api)
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn list(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let delay = params
        .iter()
        .filter(|(k, _)| k.ends_with("_like"))
        .find_map(|(_, v)| db.slow_likes.lock().unwrap().get(v).copied());
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let Some(rows) = db.collections.lock().unwrap().get(&collection).cloned() else {
        return (StatusCode::NOT_FOUND, "{}").into_response();
    };

    let filtered: Vec<Value> = rows
        .into_iter()
        .filter(|row| {
            params.iter().filter(|(k, _)| !k.starts_with('_')).all(|(key, want)| {
                match key.strip_suffix("_like") {
                    Some(field) => row
                        .get(field)
                        .map(|v| as_text(v).to_lowercase().contains(&want.to_lowercase()))
                        .unwrap_or(false),
                    None => row.get(key).map(|v| as_text(v) == *want).unwrap_or(false),
                }
            })
        })
        .collect();

    let Some(page) = params.get("_page").and_then(|p| p.parse::<usize>().ok()) else {
        return Json(filtered).into_response();
    };
    let limit = params
        .get("_limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(10);

    let total = filtered.len();
    let start = page.saturating_sub(1) * limit;
    let page_rows: Vec<Value> = filtered.into_iter().skip(start).take(limit).collect();

    let mut headers = HeaderMap::new();
    headers.insert("x-total-count", HeaderValue::from(total));
    (headers, Json(page_rows)).into_response()
}

async fn create(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    {
        let mut failing = db.failing_posts.lock().unwrap();
        if let Some(remaining) = failing.get_mut(&collection) {
            if *remaining > 0 {
                *remaining -= 1;
                return (StatusCode::INTERNAL_SERVER_ERROR, "database is locked").into_response();
            }
        }
    }

    db.collections
        .lock()
        .unwrap()
        .entry(collection)
        .or_default()
        .push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}
