//! Bound calculation module.
//!
//! Derives a read-only view of a stat against a `(min, max)` envelope:
//! ratio, percentage, distances and a state label. Nothing here mutates the
//! stats it reads.
//!
//! ```text
//! ratio      = (current - min) / (max - min)     (0 when max == min)
//! percentage = ratio * 100
//! state      = Maximum → Minimum → Critical → Low → High → Normal
//! ```

use crate::stat_map::{StatMap, StatValue};
use crate::stat_type::StatType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Tolerance used for at-min / at-max comparisons.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Minimum used when a `BoundConfig` leaves `min` unset.
pub const DEFAULT_MIN: f64 = 0.0;

/// Maximum used when a `BoundConfig` leaves `max` unset.
pub const DEFAULT_MAX: f64 = 100.0;

/// One side of a bound envelope: a literal or a function of all stats.
///
/// # Examples
///
/// ```rust
/// use statline::bound::BoundValue;
/// use statline::StatMap;
///
/// let stats = StatMap::from([("max_health", 250.0)]);
///
/// assert_eq!(BoundValue::from(10.0).evaluate(&stats), 10.0);
/// assert_eq!(BoundValue::stat("max_health").evaluate(&stats), 250.0);
/// ```
#[derive(Clone)]
pub enum BoundValue {
    Fixed(StatValue),
    Derived(Arc<dyn Fn(&StatMap) -> StatValue + Send + Sync>),
}

impl BoundValue {
    /// A bound computed from the full stat map.
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&StatMap) -> StatValue + Send + Sync + 'static,
    {
        BoundValue::Derived(Arc::new(f))
    }

    /// A bound that tracks another stat's current value.
    pub fn stat(stat: impl Into<StatType>) -> Self {
        let stat = stat.into();
        Self::derived(move |stats| stats.get(stat.as_str()))
    }

    pub fn evaluate(&self, stats: &StatMap) -> StatValue {
        match self {
            BoundValue::Fixed(v) => *v,
            BoundValue::Derived(f) => f(stats),
        }
    }
}

impl From<StatValue> for BoundValue {
    fn from(v: StatValue) -> Self {
        BoundValue::Fixed(v)
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundValue::Fixed(v) => write!(f, "Fixed({v})"),
            BoundValue::Derived(_) => write!(f, "Derived(<fn>)"),
        }
    }
}

/// Envelope configuration for one stat.
///
/// Unset bounds fall back to `0` and `100`. If the evaluated minimum is
/// greater than the maximum the two are swapped.
#[derive(Debug, Clone)]
pub struct BoundConfig {
    pub min: Option<BoundValue>,
    pub max: Option<BoundValue>,
    /// Report the current value clamped into the envelope.
    pub clamp_to_bounds: bool,
    /// Value reported when the stat is absent from the map.
    pub default_value: StatValue,
}

impl Default for BoundConfig {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            clamp_to_bounds: false,
            default_value: 0.0,
        }
    }
}

impl BoundConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a fixed `[min, max]` envelope.
    pub fn range(min: StatValue, max: StatValue) -> Self {
        Self::new().with_min(min).with_max(max)
    }

    pub fn with_min(mut self, min: impl Into<BoundValue>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max(mut self, max: impl Into<BoundValue>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn clamped(mut self, clamp: bool) -> Self {
        self.clamp_to_bounds = clamp;
        self
    }

    pub fn with_default_value(mut self, value: StatValue) -> Self {
        self.default_value = value;
        self
    }

    /// Evaluate the envelope, guaranteeing `min <= max`.
    ///
    /// A bound that evaluates to NaN or an infinity is replaced by its
    /// default.
    pub fn evaluate_range(
        &self,
        stats: &StatMap,
        default_min: StatValue,
        default_max: StatValue,
    ) -> (StatValue, StatValue) {
        let min = finite_or(
            self.min.as_ref().map_or(default_min, |b| b.evaluate(stats)),
            default_min,
        );
        let max = finite_or(
            self.max.as_ref().map_or(default_max, |b| b.evaluate(stats)),
            default_max,
        );
        if min > max {
            (max, min)
        } else {
            (min, max)
        }
    }
}

fn finite_or(value: StatValue, fallback: StatValue) -> StatValue {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// State label for a stat relative to its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundState {
    Maximum,
    Minimum,
    Critical,
    Low,
    Normal,
    High,
}

impl BoundState {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundState::Maximum => "Maximum",
            BoundState::Minimum => "Minimum",
            BoundState::Critical => "Critical",
            BoundState::Low => "Low",
            BoundState::Normal => "Normal",
            BoundState::High => "High",
        }
    }
}

impl fmt::Display for BoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ratio thresholds for the `Critical`, `Low` and `High` labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundThresholds {
    pub critical: f64,
    pub low: f64,
    pub high: f64,
}

impl Default for BoundThresholds {
    fn default() -> Self {
        Self {
            critical: 0.25,
            low: 0.5,
            high: 0.75,
        }
    }
}

/// Result of evaluating a stat against its bounds.
///
/// # Examples
///
/// ```rust
/// use statline::bound::{calculate_bounds, BoundConfig, BoundState, BoundThresholds, DEFAULT_TOLERANCE};
/// use statline::StatMap;
///
/// let stats = StatMap::from([("health", 75.0)]);
/// let result = calculate_bounds("health", &BoundConfig::range(0.0, 100.0), &stats);
///
/// assert_eq!(result.ratio(), 0.75);
/// assert_eq!(result.state(&BoundThresholds::default(), DEFAULT_TOLERANCE), BoundState::High);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundResult {
    pub stat_type: StatType,
    /// Current value, clamped if the config asked for it.
    pub current_value: StatValue,
    pub min_bound: StatValue,
    pub max_bound: StatValue,
    pub is_clamped: bool,
}

impl BoundResult {
    /// Position in the envelope; `0` when the envelope is empty.
    pub fn ratio(&self) -> f64 {
        let span = self.max_bound - self.min_bound;
        if span == 0.0 {
            0.0
        } else {
            (self.current_value - self.min_bound) / span
        }
    }

    pub fn percentage(&self) -> f64 {
        self.ratio() * 100.0
    }

    pub fn distance_from_min(&self) -> f64 {
        self.current_value - self.min_bound
    }

    pub fn distance_from_max(&self) -> f64 {
        self.max_bound - self.current_value
    }

    /// At or below the minimum, within `tolerance`.
    pub fn is_at_min(&self, tolerance: f64) -> bool {
        self.current_value <= self.min_bound + tolerance
    }

    /// At or above the maximum, within `tolerance`.
    pub fn is_at_max(&self, tolerance: f64) -> bool {
        self.current_value >= self.max_bound - tolerance
    }

    pub fn is_within_bounds(&self, tolerance: f64) -> bool {
        self.current_value >= self.min_bound - tolerance
            && self.current_value <= self.max_bound + tolerance
    }

    /// Label the result. Checks run in fixed precedence:
    /// Maximum, Minimum, Critical, Low, High, then Normal.
    pub fn state(&self, thresholds: &BoundThresholds, tolerance: f64) -> BoundState {
        let ratio = self.ratio();
        if self.is_at_max(tolerance) {
            BoundState::Maximum
        } else if self.is_at_min(tolerance) {
            BoundState::Minimum
        } else if ratio <= thresholds.critical {
            BoundState::Critical
        } else if ratio <= thresholds.low {
            BoundState::Low
        } else if ratio >= thresholds.high {
            BoundState::High
        } else {
            BoundState::Normal
        }
    }

    pub fn metrics(&self, thresholds: &BoundThresholds, tolerance: f64) -> BoundMetrics {
        BoundMetrics {
            ratio: self.ratio(),
            percentage: self.percentage(),
            distance_from_min: self.distance_from_min(),
            distance_from_max: self.distance_from_max(),
            is_at_min: self.is_at_min(tolerance),
            is_at_max: self.is_at_max(tolerance),
            is_within_bounds: self.is_within_bounds(tolerance),
            state: self.state(thresholds, tolerance),
        }
    }
}

/// Every derived metric for one `BoundResult`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundMetrics {
    pub ratio: f64,
    pub percentage: f64,
    pub distance_from_min: f64,
    pub distance_from_max: f64,
    pub is_at_min: bool,
    pub is_at_max: bool,
    pub is_within_bounds: bool,
    pub state: BoundState,
}

/// Evaluate `stat` against `config` using the default `[0, 100]` fallback.
pub fn calculate_bounds(
    stat: impl Into<StatType>,
    config: &BoundConfig,
    stats: &StatMap,
) -> BoundResult {
    calculate_bounds_with_defaults(stat, config, stats, DEFAULT_MIN, DEFAULT_MAX)
}

/// Evaluate `stat` against `config` with explicit fallbacks for unset bounds.
///
/// The stored stat is never touched; clamping only affects the reported
/// `current_value`.
pub fn calculate_bounds_with_defaults(
    stat: impl Into<StatType>,
    config: &BoundConfig,
    stats: &StatMap,
    default_min: StatValue,
    default_max: StatValue,
) -> BoundResult {
    let stat = stat.into();
    let (min_bound, max_bound) = config.evaluate_range(stats, default_min, default_max);
    let raw = stats
        .try_get(stat.as_str())
        .unwrap_or(config.default_value);

    let (current_value, is_clamped) = if config.clamp_to_bounds {
        // `f64::clamp` panics on NaN bounds.
        let clamped = raw.max(min_bound).min(max_bound);
        (clamped, clamped != raw)
    } else {
        (raw, false)
    };

    BoundResult {
        stat_type: stat,
        current_value,
        min_bound,
        max_bound,
        is_clamped,
    }
}

/// Shorthand for `calculate_bounds(..).ratio()`.
pub fn calculate_ratio(stat: impl Into<StatType>, config: &BoundConfig, stats: &StatMap) -> f64 {
    calculate_bounds(stat, config, stats).ratio()
}
