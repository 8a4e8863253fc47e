//! Shared stage-name → caps lookup table.
//!
//! The table is written by the stdout scanner thread and read by whoever
//! started the pipeline. Every access goes through the mutex.
//!
//! Records are keyed by element instance (`capsfilter0`, `capsfilter1`), so
//! two elements of the same type never merge into one record.

use super::{Caps, parse_caps_line};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Thread-safe accumulation of caps records keyed by stage instance.
///
/// Cloning a `CapsTable` yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct CapsTable {
    inner: Arc<Mutex<HashMap<String, Caps>>>,
}

impl CapsTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Caps>> {
        // The map holds plain data, so a panic elsewhere cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parses `line` and folds any match into the table.
    ///
    /// Returns the accumulated record for the stage the line named, or `None`
    /// when the line carried no stage name (the table is left untouched).
    pub fn ingest(&self, line: &str) -> Option<Caps> {
        let parsed = parse_caps_line(line)?;
        Some(self.insert(parsed))
    }

    /// Merges `caps` into the record stored under its key and returns the
    /// merged record. Records without a name are not stored.
    pub fn insert(&self, caps: Caps) -> Caps {
        if !caps.is_discovered() {
            return caps;
        }
        let mut map = self.lock();
        let entry = map.entry(caps.key().to_string()).or_default();
        entry.merge_from(&caps);
        entry.clone()
    }

    /// Returns the record for `stage`, partial or not.
    ///
    /// `stage` is an instance name or an element type. For a type, the
    /// instance with the highest counter wins, which is the one furthest
    /// downstream among unnamed elements of that type.
    pub fn get(&self, stage: &str) -> Option<Caps> {
        let map = self.lock();
        if let Some(caps) = map.get(stage) {
            return Some(caps.clone());
        }
        map.values()
            .filter(|caps| caps.name == stage)
            .max_by(|a, b| {
                a.instance_index()
                    .cmp(&b.instance_index())
                    .then_with(|| a.instance.cmp(&b.instance))
            })
            .cloned()
    }

    /// Returns the record for `stage` only if it is complete.
    pub fn get_complete(&self, stage: &str) -> Option<Caps> {
        self.get(stage).filter(Caps::is_complete)
    }

    /// Copies the whole table.
    pub fn snapshot(&self) -> HashMap<String, Caps> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
