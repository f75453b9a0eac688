//! In-memory counter state and rollup views.

use std::collections::BTreeMap;

use serde::Serialize;

use tally_core::config::CounterMode;
use tally_core::types::{SCALAR_KEY, key};

use crate::message::types::CountsPayload;

/// Key → count map owned by one counter actor.
///
/// The root aggregate is never stored; [`CounterState::root_total`]
/// recomputes it from the depth-1 keys on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    counts: BTreeMap<String, u64>,
}

/// One node of the rollup tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountNode {
    /// Full key (empty for the root).
    pub key: String,
    /// Count at this node.
    pub count: u64,
    /// Nodes one level deeper.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CountNode>,
}

impl CounterState {
    /// Empty (zero) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// State hydrated from persisted entries.
    pub fn from_entries(counts: BTreeMap<String, u64>) -> Self {
        Self { counts }
    }

    /// Count for a key; absent keys count zero.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// All entries.
    pub fn entries(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing has been counted yet.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Add one to every key and return the new value of each.
    pub fn increment(&mut self, keys: &[String]) -> BTreeMap<String, u64> {
        let mut updated = BTreeMap::new();
        for k in keys {
            let count = self.counts.entry(k.clone()).or_insert(0);
            *count = count.saturating_add(1);
            updated.insert(k.clone(), *count);
        }
        updated
    }

    /// Wire payload holding the full state.
    pub fn payload(&self, mode: CounterMode) -> CountsPayload {
        match mode {
            CounterMode::Scalar => CountsPayload::Scalar(self.get(SCALAR_KEY)),
            CounterMode::Hierarchical => CountsPayload::Keys(self.counts.clone()),
        }
    }

    /// Sum of every depth-1 key.
    pub fn root_total(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(k, _)| key::parent(k).is_none())
            .map(|(_, v)| *v)
            .sum()
    }

    /// Keys exactly one level below `prefix` (`""` is the root).
    pub fn children(&self, prefix: &str) -> BTreeMap<String, u64> {
        if prefix.is_empty() {
            return self
                .counts
                .iter()
                .filter(|(k, _)| key::parent(k).is_none())
                .map(|(k, v)| (k.clone(), *v))
                .collect();
        }

        // Descendants of `prefix` sort contiguously after `prefix.`
        let start = format!("{prefix}{}", key::KEY_SEPARATOR);
        self.counts
            .range(start.clone()..)
            .take_while(|(k, _)| k.starts_with(&start))
            .filter(|(k, _)| !k[start.len()..].contains(key::KEY_SEPARATOR))
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Keys whose count differs from the sum of their children.
    ///
    /// Leaves are skipped. An empty result means the rollup holds.
    pub fn rollup_violations(&self) -> Vec<String> {
        let mut sums: BTreeMap<&str, u64> = BTreeMap::new();
        for (k, count) in &self.counts {
            if let Some(parent) = key::parent(k) {
                let sum = sums.entry(parent).or_insert(0);
                *sum = sum.saturating_add(*count);
            }
        }

        sums.into_iter()
            .filter(|(parent, sum)| self.get(parent) != *sum)
            .map(|(parent, _)| parent.to_string())
            .collect()
    }

    /// The whole state as a tree rooted at the recomputed aggregate.
    pub fn tree(&self) -> CountNode {
        let mut index: BTreeMap<&str, Vec<(&str, u64)>> = BTreeMap::new();
        for (k, count) in &self.counts {
            index
                .entry(key::parent(k).unwrap_or(""))
                .or_default()
                .push((k.as_str(), *count));
        }

        CountNode {
            key: String::new(),
            count: self.root_total(),
            children: subtree(&index, ""),
        }
    }
}

fn subtree(index: &BTreeMap<&str, Vec<(&str, u64)>>, parent: &str) -> Vec<CountNode> {
    index
        .get(parent)
        .map(|children| {
            children
                .iter()
                .map(|(k, count)| CountNode {
                    key: k.to_string(),
                    count: *count,
                    children: subtree(index, k),
                })
                .collect()
        })
        .unwrap_or_default()
}
