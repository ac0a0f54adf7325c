//! Test target shared by the unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use hookline_core::Value;
use parking_lot::Mutex;

/// In-memory document with string-keyed fields and a trail of labels
/// recorded by interceptors.
#[derive(Debug, Default)]
pub(crate) struct Doc {
    fields: Mutex<BTreeMap<String, Value>>,
    trail: Mutex<Vec<String>>,
}

impl Doc {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set(&self, key: &str, value: impl Into<Value>) {
        self.fields.lock().insert(key.to_string(), value.into());
    }

    pub(crate) fn get(&self, key: &str) -> Option<Value> {
        self.fields.lock().get(key).cloned()
    }

    pub(crate) fn record(&self, label: impl Into<String>) {
        self.trail.lock().push(label.into());
    }

    pub(crate) fn trail(&self) -> Vec<String> {
        self.trail.lock().clone()
    }
}
