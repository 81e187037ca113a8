//! Context passed to effects and value providers.
//!
//! `EffectContext` is the per-pass snapshot an effect sees while the stat
//! store runs its apply pass. `RequestParameters` is the free-form bag a
//! caller attaches to a value request; the core passes it through without
//! interpreting it.

use crate::effect::Effect;
use crate::stat_map::{StatMap, StatValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot for one calculation pass.
///
/// `current_stats` is the working copy: it starts as a copy of the base
/// stats and every applied effect mutates it in turn, so later effects see
/// the results of earlier ones. Everything else is read-only for the pass.
///
/// # Examples
///
/// ```rust
/// use statline::{EffectContext, StatMap};
///
/// let base = StatMap::from([("health", 100.0)]);
/// let mut ctx = EffectContext::new("hero", &[], &base, 0);
///
/// ctx.current_stats.add("health", -20.0);
/// assert_eq!(ctx.stat("health"), 80.0);
/// assert_eq!(ctx.base_stat("health"), 100.0);
/// ```
pub struct EffectContext<'a> {
    pub entity_id: &'a str,
    /// Every effect attached to the entity, active or not.
    pub effect_stack: &'a [Arc<dyn Effect>],
    pub current_stats: StatMap,
    pub base_stats: &'a StatMap,
    pub timestamp: u64,
}

impl<'a> EffectContext<'a> {
    /// Build a context whose working copy starts from `base_stats`.
    pub fn new(
        entity_id: &'a str,
        effect_stack: &'a [Arc<dyn Effect>],
        base_stats: &'a StatMap,
        timestamp: u64,
    ) -> Self {
        Self {
            entity_id,
            effect_stack,
            current_stats: base_stats.clone(),
            base_stats,
            timestamp,
        }
    }

    /// Replace the working copy.
    pub fn with_current_stats(mut self, stats: StatMap) -> Self {
        self.current_stats = stats;
        self
    }

    /// Current (working) value of a stat.
    pub fn stat(&self, stat: &str) -> StatValue {
        self.current_stats.get(stat)
    }

    pub fn base_stat(&self, stat: &str) -> StatValue {
        self.base_stats.get(stat)
    }

    /// Consume the context, keeping the working copy.
    pub fn into_stats(self) -> StatMap {
        self.current_stats
    }
}

impl std::fmt::Debug for EffectContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectContext")
            .field("entity_id", &self.entity_id)
            .field(
                "effect_stack",
                &self.effect_stack.iter().map(|e| e.id()).collect::<Vec<_>>(),
            )
            .field("current_stats", &self.current_stats)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Caller-supplied parameters for a value request.
///
/// # Examples
///
/// ```rust
/// use statline::RequestParameters;
///
/// let mut params = RequestParameters::new();
/// params.set("target_armor", 40);
/// params.set("critical", true);
///
/// assert_eq!(params.get::<i32>("target_armor"), Some(40));
/// assert_eq!(params.get::<bool>("critical"), Some(true));
/// assert_eq!(params.get::<i32>("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParameters {
    data: HashMap<String, serde_json::Value>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter. Values that fail to serialize are not stored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.data.insert(key.into(), json_value);
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.set(key, value);
        self
    }

    /// Get a parameter, `None` if absent or of the wrong shape.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_starts_from_base() {
        let base = StatMap::from([("x", 10.0)]);
        let ctx = EffectContext::new("e1", &[], &base, 5);
        assert_eq!(ctx.stat("x"), 10.0);
        assert_eq!(ctx.timestamp, 5);
        assert_eq!(ctx.into_stats(), base);
    }

    #[test]
    fn test_with_current_stats() {
        let base = StatMap::from([("x", 10.0)]);
        let ctx = EffectContext::new("e1", &[], &base, 0)
            .with_current_stats(StatMap::from([("x", 3.0)]));
        assert_eq!(ctx.stat("x"), 3.0);
        assert_eq!(ctx.base_stat("x"), 10.0);
    }

    #[test]
    fn test_parameters_wrong_type() {
        let params = RequestParameters::new().with("mode", "melee");
        assert_eq!(params.get::<i32>("mode"), None);
        assert_eq!(params.get::<String>("mode"), Some("melee".to_string()));
        assert!(params.contains_key("mode"));
    }
}
