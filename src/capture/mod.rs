//! Captured responses and `${...}` substitution
//!
//! Tests marked `capture` store their parsed JSON response under the test
//! name. Later requests refer to it with placeholders like
//! `${createUser.items[0].id}`.

mod path;
mod resolve;

pub use path::{parse_path, Segment};
pub use resolve::{lookup, resolve, OUT_OF_BOUNDS};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Parsed JSON responses keyed by test name
#[derive(Debug, Clone, Default)]
pub struct CaptureStore {
    values: HashMap<String, Value>,
}

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Store `body` under `name` if it parses as JSON
    ///
    /// Returns whether anything was stored.
    pub fn capture_body(&mut self, name: &str, body: &str) -> bool {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => {
                self.insert(name, value);
                true
            }
            Err(e) => {
                tracing::debug!(test = name, error = %e, "response is not JSON, nothing captured");
                false
            }
        }
    }

    pub fn resolve(&self, template: &str) -> String {
        resolve(template, self)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where a worker reads and writes captures
///
/// In per-file dispatch each batch owns its store, seeded from setup. In
/// per-test dispatch all workers share one store for the whole run.
#[derive(Debug, Clone)]
pub enum CaptureScope {
    Batch(CaptureStore),
    Run(Arc<RwLock<CaptureStore>>),
}

impl CaptureScope {
    pub fn shared(seed: CaptureStore) -> Self {
        CaptureScope::Run(Arc::new(RwLock::new(seed)))
    }

    pub fn resolve(&self, template: &str) -> String {
        match self {
            CaptureScope::Batch(store) => store.resolve(template),
            CaptureScope::Run(store) => store.read().resolve(template),
        }
    }

    pub fn capture_body(&mut self, name: &str, body: &str) -> bool {
        match self {
            CaptureScope::Batch(store) => store.capture_body(name, body),
            CaptureScope::Run(store) => store.write().capture_body(name, body),
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> CaptureStore {
        match self {
            CaptureScope::Batch(store) => store.clone(),
            CaptureScope::Run(store) => store.read().clone(),
        }
    }
}
