// LogRelay - app/offsets.rs
//
// Per-file last-read byte offsets: the source of truth for incremental reads.
//
// Pure in-memory map, no I/O. Safe for concurrent access from request threads
// (start/stop) and the watch dispatch thread. A poisoned lock is recovered
// rather than propagated: a panic elsewhere must not disable tailing, and a
// u64 map cannot be left half-updated.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct OffsetTracker {
    offsets: RwLock<HashMap<String, u64>>,
}

impl OffsetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-read offset for `file_name`, 0 if it has never been recorded.
    pub fn get(&self, file_name: &str) -> u64 {
        self.offsets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&self, file_name: &str, offset: u64) {
        self.offsets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_name.to_string(), offset);
    }

    /// Rewind `file_name` to the start (rotation/truncation).
    pub fn reset(&self, file_name: &str) {
        self.set(file_name, 0);
    }

    /// Discard the entry for `file_name` entirely.
    pub fn remove(&self, file_name: &str) {
        self.offsets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(file_name);
    }

    /// Whether an entry exists for `file_name`.
    pub fn contains(&self, file_name: &str) -> bool {
        self.offsets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(file_name)
    }
}
