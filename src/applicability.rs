//! Applicability strategies.
//!
//! An applicability policy answers "does this effect apply right now?" for a
//! given `EffectContext`. A composed effect whose policy answers `false` is
//! inactive: it contributes nothing to the pass and is left out of the
//! priority ordering.

use crate::bound::{calculate_bounds, BoundConfig, BoundState, BoundThresholds, DEFAULT_TOLERANCE};
use crate::context::EffectContext;
use crate::error::StatError;
use crate::stat_type::StatType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decides whether an effect applies in a given context.
pub trait Applicability: Send + Sync {
    fn is_applicable(&self, ctx: &EffectContext<'_>) -> bool;

    /// Human-readable description, used in logs.
    fn description(&self) -> String;
}

/// Comparison operator for stat-threshold checks.
///
/// Parses from the usual symbols.
///
/// ```rust
/// use statline::applicability::Comparison;
///
/// let op: Comparison = ">=".parse().unwrap();
/// assert!(op.evaluate(5.0, 5.0));
/// assert!("=>".parse::<Comparison>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::LessThan => value < threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Equal => value == threshold,
            Comparison::NotEqual => value != threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::LessThan => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
        }
    }
}

impl FromStr for Comparison {
    type Err = StatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Comparison::GreaterThan),
            "<" => Ok(Comparison::LessThan),
            ">=" => Ok(Comparison::GreaterOrEqual),
            "<=" => Ok(Comparison::LessOrEqual),
            "==" => Ok(Comparison::Equal),
            "!=" => Ok(Comparison::NotEqual),
            other => Err(StatError::UnknownComparison(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Always applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApplicable;

impl Applicability for AlwaysApplicable {
    fn is_applicable(&self, _ctx: &EffectContext<'_>) -> bool {
        true
    }

    fn description(&self) -> String {
        "always".to_string()
    }
}

/// Applies when a user predicate over the context holds.
///
/// # Examples
///
/// ```rust
/// use statline::applicability::{Applicability, PredicateApplicability};
/// use statline::{EffectContext, StatMap};
///
/// let in_rage = PredicateApplicability::new(|ctx| ctx.stat("rage") > 0.0, "raging");
///
/// let base = StatMap::from([("rage", 10.0)]);
/// let ctx = EffectContext::new("hero", &[], &base, 0);
/// assert!(in_rage.is_applicable(&ctx));
/// ```
pub struct PredicateApplicability {
    predicate: Box<dyn Fn(&EffectContext<'_>) -> bool + Send + Sync>,
    description: String,
}

impl PredicateApplicability {
    pub fn new<F>(predicate: F, description: impl Into<String>) -> Self
    where
        F: Fn(&EffectContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            description: description.into(),
        }
    }
}

impl Applicability for PredicateApplicability {
    fn is_applicable(&self, ctx: &EffectContext<'_>) -> bool {
        (self.predicate)(ctx)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Applies when `current(stat) <op> threshold`.
#[derive(Debug, Clone)]
pub struct StatThresholdApplicability {
    stat: StatType,
    comparison: Comparison,
    threshold: f64,
}

impl StatThresholdApplicability {
    pub fn new(stat: impl Into<StatType>, comparison: Comparison, threshold: f64) -> Self {
        Self {
            stat: stat.into(),
            comparison,
            threshold,
        }
    }
}

impl Applicability for StatThresholdApplicability {
    fn is_applicable(&self, ctx: &EffectContext<'_>) -> bool {
        self.comparison
            .evaluate(ctx.stat(self.stat.as_str()), self.threshold)
    }

    fn description(&self) -> String {
        format!("{} {} {}", self.stat, self.comparison, self.threshold)
    }
}

/// Applies when a predicate over a stat's bound ratio holds.
pub struct BoundRatioApplicability {
    stat: StatType,
    bounds: BoundConfig,
    predicate: Box<dyn Fn(f64) -> bool + Send + Sync>,
}

impl BoundRatioApplicability {
    pub fn new<F>(stat: impl Into<StatType>, bounds: BoundConfig, predicate: F) -> Self
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        Self {
            stat: stat.into(),
            bounds,
            predicate: Box::new(predicate),
        }
    }

    /// Applies while the ratio is at or below `ratio`.
    pub fn below(stat: impl Into<StatType>, bounds: BoundConfig, ratio: f64) -> Self {
        Self::new(stat, bounds, move |r| r <= ratio)
    }

    /// Applies while the ratio is at or above `ratio`.
    pub fn above(stat: impl Into<StatType>, bounds: BoundConfig, ratio: f64) -> Self {
        Self::new(stat, bounds, move |r| r >= ratio)
    }
}

impl Applicability for BoundRatioApplicability {
    fn is_applicable(&self, ctx: &EffectContext<'_>) -> bool {
        let ratio = calculate_bounds(self.stat.clone(), &self.bounds, &ctx.current_stats).ratio();
        (self.predicate)(ratio)
    }

    fn description(&self) -> String {
        format!("ratio({})", self.stat)
    }
}

/// Applies while a stat's bound state is one of `states`.
#[derive(Debug, Clone)]
pub struct BoundStateApplicability {
    stat: StatType,
    bounds: BoundConfig,
    states: Vec<BoundState>,
    thresholds: BoundThresholds,
    tolerance: f64,
}

impl BoundStateApplicability {
    pub fn new(stat: impl Into<StatType>, bounds: BoundConfig, states: Vec<BoundState>) -> Self {
        Self {
            stat: stat.into(),
            bounds,
            states,
            thresholds: BoundThresholds::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_thresholds(mut self, thresholds: BoundThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Applicability for BoundStateApplicability {
    fn is_applicable(&self, ctx: &EffectContext<'_>) -> bool {
        let state = calculate_bounds(self.stat.clone(), &self.bounds, &ctx.current_stats)
            .state(&self.thresholds, self.tolerance);
        self.states.contains(&state)
    }

    fn description(&self) -> String {
        let states: Vec<&str> = self.states.iter().map(|s| s.as_str()).collect();
        format!("state({}) in [{}]", self.stat, states.join(", "))
    }
}
