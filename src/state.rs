//! Immutable scan snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tag::Value;

/// Delta of the scan that produced a state, in seconds.
pub const DT_KEY: &str = "_dt";

/// Edge detection snapshot of a tag.
pub fn prev_key(tag: &str) -> String {
    format!("_prev:{}", tag)
}

/// Timer fractional carry, keyed by the accumulator tag.
pub fn frac_key(tag: &str) -> String {
    format!("_frac:{}", tag)
}

pub type ValueMap = BTreeMap<String, Value>;

/// One committed scan.
///
/// Maps are shared between consecutive states: a scan that never touched
/// `memory` hands the same allocation to its successor. Nothing ever mutates
/// a `SystemState` after [`crate::context::ScanContext::commit`] returns it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemState {
    pub scan_id: u64,
    pub timestamp: f64,
    pub tags: Arc<ValueMap>,
    pub memory: Arc<ValueMap>,
}

impl SystemState {
    pub fn new() -> Self {
        SystemState::default()
    }

    /// Initial state with the given tag values (scan 0).
    pub fn with_tags<I, K, V>(tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        SystemState {
            tags: Arc::new(
                tags.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..SystemState::default()
        }
    }

    pub fn tag(&self, name: &str) -> Option<&Value> {
        self.tags.get(name)
    }

    pub fn memory(&self, key: &str) -> Option<&Value> {
        self.memory.get(key)
    }

    /// Derives a state with some tags overridden, as a driver does when it
    /// injects inputs between scans. The receiver is left untouched.
    pub fn patched<I, K, V>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut next = self.clone();
        let map = Arc::make_mut(&mut next.tags);
        for (k, v) in tags {
            map.insert(k.into(), v.into());
        }
        next
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
