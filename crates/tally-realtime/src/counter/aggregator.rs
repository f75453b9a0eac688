//! Hierarchical key aggregator.
//!
//! Expands a classification into the chain of prefix keys it increments:
//! `DE` + `[0, 1]` → `["DE", "DE.0", "DE.0.1"]`. Incrementing every prefix
//! once per call keeps each internal node equal to the sum of its children.

use tally_core::config::CounterMode;
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::types::{Classification, KEY_SEPARATOR, SCALAR_KEY};

/// Resolves classification inputs into key chains for one counter mode.
#[derive(Debug, Clone, Copy)]
pub struct KeyAggregator {
    mode: CounterMode,
    depth: usize,
}

impl KeyAggregator {
    /// Create an aggregator. `depth` is the exact number of bits a
    /// hierarchical classification must carry.
    pub fn new(mode: CounterMode, depth: usize) -> Self {
        Self { mode, depth }
    }

    /// Keys to increment for one input.
    ///
    /// A scalar counter ignores the input and always touches its single
    /// key. A hierarchical counter rejects a missing input or one whose
    /// depth differs from the configured depth.
    pub fn resolve(&self, input: Option<&Classification>) -> AppResult<Vec<String>> {
        match self.mode {
            CounterMode::Scalar => Ok(vec![SCALAR_KEY.to_string()]),
            CounterMode::Hierarchical => {
                let classification = input.ok_or_else(|| {
                    AppError::validation("A classification is required to increment this counter")
                })?;
                if classification.bits().len() != self.depth {
                    return Err(AppError::validation(format!(
                        "Classification '{classification}' has {} bits, expected {}",
                        classification.bits().len(),
                        self.depth
                    )));
                }
                Ok(prefix_chain(classification))
            }
        }
    }
}

/// Every prefix of the classification, shortest first.
pub fn prefix_chain(classification: &Classification) -> Vec<String> {
    let mut chain: Vec<String> = Vec::with_capacity(classification.bits().len() + 1);
    for segment in classification.segments() {
        let key = match chain.last() {
            Some(prev) => format!("{prev}{KEY_SEPARATOR}{segment}"),
            None => segment,
        };
        chain.push(key);
    }
    chain
}
