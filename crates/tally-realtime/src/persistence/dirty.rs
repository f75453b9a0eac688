//! Keys modified since the last successful flush.

use std::collections::BTreeMap;

/// Pending writes, last value wins per key.
#[derive(Debug, Clone, Default)]
pub struct DirtySet {
    entries: BTreeMap<String, u64>,
}

impl DirtySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest value of a key.
    pub fn mark(&mut self, key: impl Into<String>, value: u64) {
        self.entries.insert(key.into(), value);
    }

    /// Copy of every pending entry, in key order.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Drop entries that were written, unless they changed since.
    ///
    /// Returns how many entries were cleared.
    pub fn clear_flushed(&mut self, flushed: &[(String, u64)]) -> usize {
        let mut cleared = 0;
        for (key, value) in flushed {
            if self.entries.get(key) == Some(value) {
                self.entries.remove(key);
                cleared += 1;
            }
        }
        cleared
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
