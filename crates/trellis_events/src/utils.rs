//! Utility functions and helpers

use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix used by [`unique_id`] when none is supplied
pub const DEFAULT_ID_PREFIX: &str = "trellis_";

/// Generate an identifier from a prefix and a monotonically increasing
/// counter. Dots in the prefix are replaced with underscores.
pub fn unique_id(prefix: Option<&str>, counter: &AtomicU64) -> String {
    let prefix = prefix
        .map(|prefix| prefix.replace('.', "_"))
        .unwrap_or_else(|| DEFAULT_ID_PREFIX.to_string());
    format!("{}{}", prefix, counter.fetch_add(1, Ordering::Relaxed))
}

/// Split a whitespace separated list of event names
pub fn split_names(names: &str) -> SmallVec<[CompactString; 4]> {
    names.split_whitespace().map(CompactString::new).collect()
}
