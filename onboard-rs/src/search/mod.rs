//! Typeahead search
//!
//! [`SearchEngine`] turns keystrokes into debounced, cancellable remote
//! searches and owns the keyboard selection state of the suggestion list.

use serde::de::DeserializeOwned;
use std::str::FromStr;

use crate::api::OptionId;
use crate::error::OnboardError;

pub mod engine;
pub mod options;

pub use engine::{SearchEngine, SearchEngineBuilder};
pub use options::{department_search, location_search};

/// An option the engine can list and commit
pub trait SearchOption: DeserializeOwned + Clone + Send + Sync + 'static {
    fn option_id(&self) -> &OptionId;

    /// Text shown in the list and written to the input on selection
    fn label(&self) -> &str;
}

/// One evaluation of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Trimmed input
    pub text: String,
    pub min_length: usize,
    /// Remote field the `_like` filter applies to
    pub field_hint: String,
}

impl SearchQuery {
    pub fn new(raw: &str, min_length: usize, field_hint: &str) -> Self {
        Self {
            text: raw.trim().to_string(),
            min_length,
            field_hint: field_hint.to_string(),
        }
    }

    /// Long enough to hit the network
    pub fn is_satisfied(&self) -> bool {
        self.text.chars().count() >= self.min_length
    }
}

/// Options produced by one request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<T> {
    pub options: Vec<T>,
    pub query: SearchQuery,
    /// Generation of the request; only the latest one may be applied
    pub sequence: u64,
}

/// Suggestion list state
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState<T> {
    pub options: Vec<T>,
    /// `None` plays the role of index -1
    pub highlighted_index: Option<usize>,
    pub is_open: bool,
    pub is_loading: bool,
}

impl<T> Default for SelectionState<T> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            highlighted_index: None,
            is_open: false,
            is_loading: false,
        }
    }
}

impl<T> SelectionState<T> {
    pub fn highlighted(&self) -> Option<&T> {
        self.highlighted_index.and_then(|i| self.options.get(i))
    }

    /// Signed index, -1 when nothing is highlighted
    pub fn highlighted_position(&self) -> i64 {
        self.highlighted_index.map(|i| i as i64).unwrap_or(-1)
    }

    fn clear(&mut self) {
        self.options.clear();
        self.highlighted_index = None;
        self.is_open = false;
        self.is_loading = false;
    }

    /// Re-establish the highlight and open/closed invariants after a mutation
    fn normalize(&mut self) {
        if let Some(i) = self.highlighted_index {
            if i >= self.options.len() {
                self.highlighted_index = self.options.len().checked_sub(1);
            }
        }
        if self.options.is_empty() && !self.is_loading {
            self.is_open = false;
        }
    }
}

/// What a renderer should show below the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    Hidden,
    Loading,
    Options,
    /// Last response came back empty for a query that is still valid
    NoResults,
}

/// Navigation keys handled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
}

impl FromStr for Key {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowUp" => Ok(Key::ArrowUp),
            "ArrowDown" => Ok(Key::ArrowDown),
            "Enter" => Ok(Key::Enter),
            "Escape" => Ok(Key::Escape),
            other => Err(OnboardError::Validation(format!("Unsupported key: {}", other))),
        }
    }
}

/// Bounding box of the widget, in the renderer's coordinate space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// Keep options whose label contains `text`, ignoring case
pub fn filter_by_label<T: SearchOption>(options: Vec<T>, text: &str) -> Vec<T> {
    let needle = text.to_lowercase();
    if needle.is_empty() {
        return options;
    }
    options
        .into_iter()
        .filter(|option| option.label().to_lowercase().contains(&needle))
        .collect()
}
