//! Dot-delimited hierarchical counter keys.
//!
//! A key such as `DE.0.1` names a node in the count tree: `DE` is its
//! depth-1 ancestor and `DE.0` its parent. The implicit root has no key;
//! its aggregate is recomputed from the depth-1 keys.

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '.';

/// The only key used by a scalar counter.
pub const SCALAR_KEY: &str = "count";

/// Number of segments in a key (`DE` → 1, `DE.0.1` → 3).
pub fn depth(key: &str) -> usize {
    if key.is_empty() {
        0
    } else {
        key.split(KEY_SEPARATOR).count()
    }
}

/// The key one level up, or `None` for a depth-1 key.
pub fn parent(key: &str) -> Option<&str> {
    key.rfind(KEY_SEPARATOR).map(|pos| &key[..pos])
}

/// Whether `key` sits exactly one level below `prefix`.
///
/// An empty prefix stands for the root, whose children are depth-1 keys.
pub fn is_child_of(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return depth(key) == 1;
    }
    match parent(key) {
        Some(p) => p == prefix,
        None => false,
    }
}
