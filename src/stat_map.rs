//! Stat map module.
//!
//! `StatMap` is the key → value table used for base stats, the working copy
//! of a calculation pass, and computed results. Absent keys read as `0.0`.

use crate::stat_type::StatType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Floating-point stat value.
pub type StatValue = f64;

/// A map of stat values keyed by `StatType`.
///
/// Reads never fail: a stat that was never set is `0.0`. Effects may
/// introduce keys absent from the base stats; they simply start at zero.
///
/// # Examples
///
/// ```rust
/// use statline::StatMap;
///
/// let mut stats = StatMap::new();
/// stats.set("health", 80.0);
/// stats.add("health", 20.0);
///
/// assert_eq!(stats.get("health"), 100.0);
/// assert_eq!(stats.get("mana"), 0.0);
/// assert!(!stats.contains("mana"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatMap {
    values: HashMap<StatType, StatValue>,
}

impl StatMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a stat, `0.0` when absent.
    pub fn get(&self, stat: &str) -> StatValue {
        self.values.get(stat).copied().unwrap_or(0.0)
    }

    /// Read a stat only if it is present.
    pub fn try_get(&self, stat: &str) -> Option<StatValue> {
        self.values.get(stat).copied()
    }

    /// Set a stat, returning the previous value if there was one.
    pub fn set(&mut self, stat: impl Into<StatType>, value: StatValue) -> Option<StatValue> {
        self.values.insert(stat.into(), value)
    }

    /// Add `delta` to a stat (absent stats start at zero).
    pub fn add(&mut self, stat: impl Into<StatType>, delta: StatValue) {
        *self.values.entry(stat.into()).or_insert(0.0) += delta;
    }

    /// Remove a stat, returning its value if it was present.
    pub fn remove(&mut self, stat: &str) -> Option<StatValue> {
        self.values.remove(stat)
    }

    pub fn contains(&self, stat: &str) -> bool {
        self.values.contains_key(stat)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatType, &StatValue)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StatType> {
        self.values.keys()
    }

    /// Keys in lexicographic order, for deterministic output.
    pub fn sorted_keys(&self) -> Vec<StatType> {
        let mut keys: Vec<StatType> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl From<HashMap<StatType, StatValue>> for StatMap {
    fn from(values: HashMap<StatType, StatValue>) -> Self {
        Self { values }
    }
}

impl<K: Into<StatType>> FromIterator<(K, StatValue)> for StatMap {
    fn from_iter<I: IntoIterator<Item = (K, StatValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<StatType>, const N: usize> From<[(K, StatValue); N]> for StatMap {
    fn from(entries: [(K, StatValue); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_reads_zero() {
        let stats = StatMap::new();
        assert_eq!(stats.get("anything"), 0.0);
        assert_eq!(stats.try_get("anything"), None);
    }

    #[test]
    fn test_add_introduces_key() {
        let mut stats = StatMap::from([("health", 10.0)]);
        stats.add("shield", 5.0);
        assert_eq!(stats.get("shield"), 5.0);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_sorted_keys() {
        let stats = StatMap::from([("b", 1.0), ("a", 2.0), ("c", 3.0)]);
        let keys: Vec<String> = stats
            .sorted_keys()
            .iter()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_transparent_serde() {
        let stats = StatMap::from([("health", 50.0)]);
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, "{\"health\":50.0}");
    }
}
