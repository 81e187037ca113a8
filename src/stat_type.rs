//! Stat key module.
//!
//! Provides the `StatType` type, the string key naming a stat. Uses
//! `Arc<str>` so keys are cheap to clone into stat maps, contexts and events.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::sync::Arc;

/// Interned string key for stats.
///
/// The engine never interprets stat names; `"health"`, `"armor"` or
/// `"fire_resist"` are all just keys.
///
/// # Examples
///
/// ```rust
/// use statline::StatType;
///
/// let health = StatType::new("health");
/// let health2: StatType = "health".into();
/// let health3: StatType = String::from("health").into();
///
/// assert_eq!(health, health2);
/// assert_eq!(health, health3);
/// assert_eq!(health.as_str(), "health");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatType(Arc<str>);

impl Serialize for StatType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatType::from(s))
    }
}

impl StatType {
    /// Create a new `StatType` from a string slice.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StatType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StatType {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&StatType> for StatType {
    fn from(s: &StatType) -> Self {
        s.clone()
    }
}

// Lets `HashMap<StatType, _>` be queried with a plain `&str`.
impl Borrow<str> for StatType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StatType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_stat_type_creation() {
        let a = StatType::new("health");
        let b = StatType::new("health");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "health");
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(StatType::new("mana"), 5.0);
        assert_eq!(map.get("mana"), Some(&5.0));
    }

    #[test]
    fn test_serde_as_plain_string() {
        let key = StatType::new("armor");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"armor\"");
        let back: StatType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
