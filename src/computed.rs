//! Computed stat results module.
//!
//! Contains `ComputedStats`, the output of one calculation pass together
//! with the fingerprint that validates it and the effects that took part.

use crate::stat_map::StatMap;
use serde::{Deserialize, Serialize};

/// Result of one calculation pass.
///
/// # Examples
///
/// ```rust
/// use statline::{ComputedStats, StatMap};
///
/// let computed = ComputedStats::new(
///     ComputedStats::fingerprint("hero", &["b", "a"]),
///     StatMap::from([("health", 100.0)]),
///     vec!["a".to_string()],
///     1_000,
/// );
///
/// assert_eq!(computed.fingerprint, "hero|a,b");
/// assert!(computed.is_fresh(1_999, 1_000));
/// assert!(!computed.is_fresh(2_000, 1_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStats {
    /// Entity id plus the sorted attached effect ids.
    pub fingerprint: String,

    /// Final stat values.
    pub stats: StatMap,

    /// Ids of the effects that were active in the pass, in application order.
    pub contributing_effects: Vec<String>,

    /// When the pass ran, in milliseconds.
    pub computed_at: u64,
}

impl ComputedStats {
    pub fn new(
        fingerprint: String,
        stats: StatMap,
        contributing_effects: Vec<String>,
        computed_at: u64,
    ) -> Self {
        Self {
            fingerprint,
            stats,
            contributing_effects,
            computed_at,
        }
    }

    /// Build the cache key for an entity and its attached effect ids.
    ///
    /// Attachment order does not matter.
    pub fn fingerprint<S: AsRef<str>>(entity_id: &str, effect_ids: &[S]) -> String {
        let mut ids: Vec<&str> = effect_ids.iter().map(AsRef::as_ref).collect();
        ids.sort_unstable();
        format!("{}|{}", entity_id, ids.join(","))
    }

    /// Whether the result is younger than `ttl_ms` at `now`.
    pub fn is_fresh(&self, now: u64, ttl_ms: u64) -> bool {
        now.saturating_sub(self.computed_at) < ttl_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_order_independent() {
        let a = ComputedStats::fingerprint("e", &["x", "y", "z"]);
        let b = ComputedStats::fingerprint("e", &["z", "x", "y"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_no_effects() {
        let empty: [&str; 0] = [];
        assert_eq!(ComputedStats::fingerprint("e", &empty), "e|");
    }

    #[test]
    fn test_freshness_boundary() {
        let computed = ComputedStats::new("e|".to_string(), StatMap::new(), Vec::new(), 100);
        assert!(computed.is_fresh(100, 1000));
        assert!(computed.is_fresh(1099, 1000));
        assert!(!computed.is_fresh(1100, 1000));
    }

    #[test]
    fn test_clone_keeps_contributors() {
        let computed = ComputedStats::new(
            "e|a".to_string(),
            StatMap::from([("x", 1.0)]),
            vec!["a".to_string()],
            0,
        );
        let copy = computed.clone();
        assert_eq!(copy, computed);
        assert_eq!(copy.contributing_effects, vec!["a".to_string()]);
    }
}
