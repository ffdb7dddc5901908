//! Debounced, cancel-safe typeahead engine
//!
//! Text changes arm a trailing debounce timer. When it fires, the previous
//! request is cancelled, the generation counter is bumped and a new request
//! is issued. A response is applied only if its generation is still current,
//! so a slow, superseded response can never overwrite newer options.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{filter_by_label, Key, ListView, Region, SearchOption, SearchQuery, SearchResult, SelectionState};
use crate::api::{with_cancel, OnboardApi};
use crate::config::SearchConfig;
use crate::debounce::Debouncer;

type SelectCallback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Typeahead engine for one input
pub struct SearchEngine<T: SearchOption> {
    inner: Arc<Inner<T>>,
}

impl<T: SearchOption> Clone for SearchEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T: SearchOption> {
    api: OnboardApi,
    endpoint: String,
    field: String,
    min_length: usize,
    debouncer: Debouncer,
    on_select: Option<SelectCallback<T>>,
    state: Mutex<EngineState<T>>,
}

struct EngineState<T> {
    input: String,
    selection: SelectionState<T>,
    generation: u64,
    in_flight: Option<CancellationToken>,
    /// Query of the last applied response
    settled: Option<SearchQuery>,
    region: Option<Region>,
}

impl<T> EngineState<T> {
    /// Cancel the outstanding request and make any late response stale
    fn invalidate(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    fn apply(&mut self, result: SearchResult<T>) -> bool {
        if result.sequence != self.generation {
            debug!(
                "Discarding stale results for '{}' (seq {} < {})",
                result.query.text, result.sequence, self.generation
            );
            return false;
        }

        self.selection.highlighted_index = if result.options.is_empty() { None } else { Some(0) };
        self.selection.options = result.options;
        self.selection.is_loading = false;
        self.in_flight = None;
        self.settled = Some(result.query);
        self.selection.normalize();
        true
    }
}

/// Builder for [`SearchEngine`]
pub struct SearchEngineBuilder<T: SearchOption> {
    api: OnboardApi,
    endpoint: String,
    field: String,
    min_length: usize,
    debounce: Duration,
    on_select: Option<SelectCallback<T>>,
}

impl<T: SearchOption> SearchEngineBuilder<T> {
    pub fn min_chars(mut self, min_chars: usize) -> Self {
        self.min_length = min_chars;
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    pub fn config(self, config: &SearchConfig) -> Self {
        self.min_chars(config.min_chars).debounce(config.debounce())
    }

    /// Called with the full option after every committed selection
    pub fn on_select<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_select = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> SearchEngine<T> {
        SearchEngine {
            inner: Arc::new(Inner {
                api: self.api,
                endpoint: self.endpoint,
                field: self.field,
                min_length: self.min_length,
                debouncer: Debouncer::new(self.debounce),
                on_select: self.on_select,
                state: Mutex::new(EngineState {
                    input: String::new(),
                    selection: SelectionState::default(),
                    generation: 0,
                    in_flight: None,
                    settled: None,
                    region: None,
                }),
            }),
        }
    }
}

impl<T: SearchOption> SearchEngine<T> {
    /// Start building an engine searching `endpoint` on `field`
    pub fn builder(
        api: OnboardApi,
        endpoint: impl Into<String>,
        field: impl Into<String>,
    ) -> SearchEngineBuilder<T> {
        let defaults = SearchConfig::default();
        SearchEngineBuilder {
            api,
            endpoint: endpoint.into(),
            field: field.into(),
            min_length: defaults.min_chars,
            debounce: defaults.debounce(),
            on_select: None,
        }
    }

    /// User typed: re-evaluate after the debounce window
    pub async fn on_query_change(&self, text: &str) {
        let query = self.query_for(text);
        let mut state = self.inner.state.lock().await;

        let unchanged = state.input.trim() == query.text;
        state.input = text.to_string();
        if unchanged {
            return;
        }

        if !query.is_satisfied() {
            self.inner.debouncer.cancel();
            state.invalidate();
            state.selection.clear();
            state.settled = None;
            debug!("Query '{}' below minimum length, results cleared", query.text);
            return;
        }

        state.selection.is_open = true;
        state.selection.normalize();

        // Armed under the lock so the last writer of `input` owns the timer
        let weak = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            evaluate(weak, query).await;
        });
    }

    /// Evaluate `text` immediately, bypassing the debounce timer
    pub async fn search_now(&self, text: &str) {
        let query = self.query_for(text);
        {
            let mut state = self.inner.state.lock().await;
            state.input = text.to_string();
            self.inner.debouncer.cancel();
            if !query.is_satisfied() {
                state.invalidate();
                state.selection.clear();
                state.settled = None;
                return;
            }
        }
        evaluate(Arc::downgrade(&self.inner), query).await;
    }

    /// Keyboard navigation; returns the option committed by `Enter`
    pub async fn on_key(&self, key: Key) -> Option<T> {
        let mut state = self.inner.state.lock().await;
        let selection = &mut state.selection;
        if !selection.is_open || selection.options.is_empty() {
            return None;
        }

        let last = selection.options.len() - 1;
        match key {
            Key::ArrowDown => {
                selection.highlighted_index = Some(match selection.highlighted_index {
                    Some(i) => (i + 1).min(last),
                    None => 0,
                });
                None
            }
            Key::ArrowUp => {
                if let Some(i) = selection.highlighted_index {
                    selection.highlighted_index = Some(i.saturating_sub(1));
                }
                None
            }
            Key::Escape => {
                selection.is_open = false;
                None
            }
            Key::Enter => {
                let option = selection.highlighted().cloned()?;
                drop(state);
                self.on_select(option.clone()).await;
                Some(option)
            }
        }
    }

    /// Commit `option`: label goes to the input without re-triggering a search
    pub async fn on_select(&self, option: T) {
        {
            let mut state = self.inner.state.lock().await;
            self.inner.debouncer.cancel();
            state.invalidate();
            state.input = option.label().to_string();
            state.selection.clear();
            state.settled = None;
        }

        debug!("Selected option {}", option.option_id());
        if let Some(callback) = &self.inner.on_select {
            callback(option);
        }
    }

    /// Mirror an externally held value (e.g. a restored draft) into the input
    pub async fn sync_value(&self, value: Option<&T>) {
        let mut state = self.inner.state.lock().await;
        self.inner.debouncer.cancel();
        state.invalidate();
        state.input = value.map(|v| v.label().to_string()).unwrap_or_default();
        state.selection.clear();
        state.settled = None;
    }

    /// Reopen a list that still has options
    pub async fn on_focus(&self) {
        let mut state = self.inner.state.lock().await;
        if !state.selection.options.is_empty() {
            state.selection.is_open = true;
        }
    }

    pub async fn set_region(&self, region: Region) {
        self.inner.state.lock().await.region = Some(region);
    }

    /// Pointer press anywhere on screen; closes the list when outside the widget
    pub async fn on_pointer_down(&self, x: f64, y: f64) {
        let mut state = self.inner.state.lock().await;
        let inside = state.region.map(|r| r.contains(x, y)).unwrap_or(false);
        if !inside {
            state.selection.is_open = false;
        }
    }

    /// Tear down: drop the pending timer and the outstanding request
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.debouncer.cancel();
        state.invalidate();
        state.selection.is_loading = false;
        state.selection.normalize();
    }

    pub async fn snapshot(&self) -> SelectionState<T> {
        self.inner.state.lock().await.selection.clone()
    }

    pub async fn input_text(&self) -> String {
        self.inner.state.lock().await.input.clone()
    }

    pub async fn list_view(&self) -> ListView {
        let state = self.inner.state.lock().await;
        let selection = &state.selection;

        if selection.is_loading {
            return ListView::Loading;
        }
        if !selection.options.is_empty() {
            return if selection.is_open { ListView::Options } else { ListView::Hidden };
        }

        let has_query = self.query_for(&state.input).is_satisfied();
        if has_query && state.settled.is_some() {
            ListView::NoResults
        } else {
            ListView::Hidden
        }
    }

    fn query_for(&self, text: &str) -> SearchQuery {
        SearchQuery::new(text, self.inner.min_length, &self.inner.field)
    }
}

/// Timer fired: issue the request and apply its result if still current
async fn evaluate<T: SearchOption>(inner: Weak<Inner<T>>, query: SearchQuery) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let (token, sequence) = {
        let mut state = inner.state.lock().await;
        if state.input.trim() != query.text {
            debug!("Skipping outdated query '{}'", query.text);
            return;
        }
        state.invalidate();
        let token = CancellationToken::new();
        state.in_flight = Some(token.clone());
        state.selection.is_loading = true;
        state.selection.is_open = true;
        (token, state.generation)
    };

    debug!("Searching {} for '{}' (seq {})", inner.endpoint, query.text, sequence);
    let fetched = with_cancel(
        &token,
        inner.api.search::<T>(&inner.endpoint, &query.field_hint, &query.text),
    )
    .await;

    let mut state = inner.state.lock().await;
    match fetched {
        Ok(options) => {
            let options = filter_by_label(options, &query.text);
            state.apply(SearchResult {
                options,
                query,
                sequence,
            });
        }
        Err(e) if e.is_cancelled() => {
            debug!("Search for '{}' superseded", query.text);
        }
        Err(e) => {
            if state.generation == sequence {
                state.selection.is_loading = false;
                state.in_flight = None;
                state.selection.normalize();
            }
            warn!("Search for '{}' failed: {}", query.text, e);
        }
    }
}
