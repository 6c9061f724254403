//! Deterministic sorting helpers.
//!
//! Thin, explicit wrappers around `slice::sort_by` that make the ordering
//! guarantees the resolver and encoder depend on auditable at the call site,
//! rather than relying on incidental `HashMap`/`HashSet` iteration order.

use crate::errors::{CoreError, CoreResult};

/// Stable-sort `items` by an extracted key. A thin wrapper over
/// `sort_by`, kept as a named call site so every ordering-sensitive sort in
/// the resolver/encoder is easy to audit.
pub fn stable_sort_by_key<T, K, F>(items: &mut [T], mut key_fn: F)
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    items.sort_by(|a, b| key_fn(a).cmp(&key_fn(b)));
}

/// Verify `items` are already sorted per `key_fn`, returning an invariant
/// violation otherwise. Used in tests and debug assertions around the
/// resolver's sortedness guarantees.
pub fn ensure_sorted<T, K, F>(items: &[T], mut key_fn: F) -> CoreResult<()>
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    for w in items.windows(2) {
        if key_fn(&w[0]) > key_fn(&w[1]) {
            return Err(CoreError::invariant(
                "collection is not sorted deterministically",
            ));
        }
    }
    Ok(())
}
