//! Application strategies.
//!
//! An application policy turns a computed impact into a mutation of the
//! working stat map, and knows how to undo it.
//!
//! Division by a zero current value is never attempted: the multiplicative
//! policies skip the mutation instead (and log a warning), leaving the stat
//! unchanged.

use crate::stat_map::StatMap;
use crate::stat_type::StatType;

/// Mutates a stat map with an impact, and reverses that mutation.
pub trait Application: Send + Sync {
    fn apply_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64);

    fn reverse_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64);

    /// Human-readable description, used in logs.
    fn description(&self) -> String;
}

/// `stat += impact`, reversed by `stat -= impact`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveApplication;

impl Application for AdditiveApplication {
    fn apply_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        stats.add(stat, impact);
    }

    fn reverse_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        stats.add(stat, -impact);
    }

    fn description(&self) -> String {
        "add".to_string()
    }
}

/// `stat *= 1 + impact / stat`, reversed by dividing by the same factor.
///
/// The factor is derived from the value at call time, so paired with an
/// impact proportional to the current value (`MultiplicativeImpact`,
/// `PercentageImpact`) the reverse restores the original exactly.
///
/// # Examples
///
/// ```rust
/// use statline::application::{Application, MultiplicativeApplication};
/// use statline::{StatMap, StatType};
///
/// let speed = StatType::new("speed");
/// let mut stats = StatMap::from([("speed", 10.0)]);
///
/// MultiplicativeApplication.apply_impact(&mut stats, &speed, 5.0);
/// assert_eq!(stats.get("speed"), 15.0);
///
/// // Zero has no multiplicative inverse: nothing happens.
/// let mut empty = StatMap::new();
/// MultiplicativeApplication.apply_impact(&mut empty, &speed, 5.0);
/// assert_eq!(empty.get("speed"), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativeApplication;

impl Application for MultiplicativeApplication {
    fn apply_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        let current = stats.get(stat.as_str());
        if current == 0.0 {
            tracing::warn!(stat = %stat, impact, "skipping multiplicative apply on zero value");
            return;
        }
        stats.set(stat, current * (1.0 + impact / current));
    }

    fn reverse_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        let current = stats.get(stat.as_str());
        if current == 0.0 {
            tracing::warn!(stat = %stat, impact, "skipping multiplicative reverse on zero value");
            return;
        }
        let factor = 1.0 + impact / current;
        if factor == 0.0 {
            tracing::warn!(stat = %stat, impact, "skipping multiplicative reverse with zero factor");
            return;
        }
        stats.set(stat, current / factor);
    }

    fn description(&self) -> String {
        "multiply".to_string()
    }
}

/// `stat = base + impact`, reversed by `stat = base`.
///
/// The reverse is lossy: whatever impact was applied, undoing
/// it resets the stat to the fixed base.
#[derive(Debug, Clone, Copy)]
pub struct SetValueApplication {
    base: f64,
}

impl SetValueApplication {
    pub fn new(base: f64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> f64 {
        self.base
    }
}

impl Application for SetValueApplication {
    fn apply_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        stats.set(stat, self.base + impact);
    }

    fn reverse_impact(&self, stats: &mut StatMap, stat: &StatType, _impact: f64) {
        stats.set(stat, self.base);
    }

    fn description(&self) -> String {
        format!("set({:.2})", self.base)
    }
}

/// Treats the impact as percentage points of the current value:
/// `stat += stat * impact / 100`, reversed by dividing by `1 + impact / 100`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentageApplication;

impl Application for PercentageApplication {
    fn apply_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        let current = stats.get(stat.as_str());
        stats.set(stat, current * (1.0 + impact / 100.0));
    }

    fn reverse_impact(&self, stats: &mut StatMap, stat: &StatType, impact: f64) {
        let factor = 1.0 + impact / 100.0;
        if factor == 0.0 {
            tracing::warn!(stat = %stat, impact, "skipping percentage reverse with zero factor");
            return;
        }
        let current = stats.get(stat.as_str());
        stats.set(stat, current / factor);
    }

    fn description(&self) -> String {
        "percent".to_string()
    }
}
