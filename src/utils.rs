//! Small deterministic-iteration helpers shared across modules.
//!
//! `ahash`'s maps and sets make no iteration-order promise, and several
//! passes (C4's Tarjan traversal, C5's fix-point, pretty-printing) need a
//! stable order to stay deterministic across runs on the same grammar.
use ahash::AHashMap;

/// Returns the keys of `map` in ascending order.
pub(crate) fn sorted_keys<K: Ord + Copy, V>(map: &AHashMap<K, V>) -> Vec<K> {
    let mut keys: Vec<K> = map.keys().copied().collect();
    keys.sort_unstable();
    keys
}
