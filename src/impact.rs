//! Impact strategies.
//!
//! An impact policy computes the delta an effect wants to make to one
//! target stat. It reads the context (usually `current_stats`) and returns
//! a number; the application policy decides what that number means.
//!
//! Impacts are recomputed on every call. A composed effect's `reverse`
//! does not remember the value computed by `apply`.

use crate::bound::{calculate_bounds, BoundConfig};
use crate::context::EffectContext;
use crate::stat_type::StatType;

/// Computes the delta for one target stat.
pub trait Impact: Send + Sync {
    fn calculate_impact(&self, ctx: &EffectContext<'_>, stat: &StatType) -> f64;

    /// Human-readable description, used in logs.
    fn description(&self) -> String;
}

/// A constant delta.
#[derive(Debug, Clone, Copy)]
pub struct FixedImpact {
    value: f64,
}

impl FixedImpact {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Impact for FixedImpact {
    fn calculate_impact(&self, _ctx: &EffectContext<'_>, _stat: &StatType) -> f64 {
        self.value
    }

    fn description(&self) -> String {
        format!("{:+.2}", self.value)
    }
}

/// `delta = current * (factor - 1)`, so that adding it scales by `factor`.
#[derive(Debug, Clone, Copy)]
pub struct MultiplicativeImpact {
    factor: f64,
}

impl MultiplicativeImpact {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Impact for MultiplicativeImpact {
    fn calculate_impact(&self, ctx: &EffectContext<'_>, stat: &StatType) -> f64 {
        ctx.stat(stat.as_str()) * (self.factor - 1.0)
    }

    fn description(&self) -> String {
        format!("×{:.2}", self.factor)
    }
}

/// `delta = current * percentage`, with `percentage` as a fraction (0.1 = 10%).
#[derive(Debug, Clone, Copy)]
pub struct PercentageImpact {
    percentage: f64,
}

impl PercentageImpact {
    pub fn new(percentage: f64) -> Self {
        Self { percentage }
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }
}

impl Impact for PercentageImpact {
    fn calculate_impact(&self, ctx: &EffectContext<'_>, stat: &StatType) -> f64 {
        ctx.stat(stat.as_str()) * self.percentage
    }

    fn description(&self) -> String {
        format!("{:+.1}%", self.percentage * 100.0)
    }
}

/// Delta computed from another stat's bound ratio.
///
/// # Examples
///
/// ```rust
/// use statline::impact::{BoundRatioImpact, Impact};
/// use statline::bound::BoundConfig;
/// use statline::{EffectContext, StatMap, StatType};
///
/// // Up to +50 damage as health drops.
/// let berserk = BoundRatioImpact::new("health", BoundConfig::range(0.0, 100.0), |ratio| {
///     (1.0 - ratio) * 50.0
/// });
///
/// let base = StatMap::from([("health", 40.0)]);
/// let ctx = EffectContext::new("hero", &[], &base, 0);
/// assert_eq!(berserk.calculate_impact(&ctx, &StatType::new("damage")), 30.0);
/// ```
pub struct BoundRatioImpact {
    bound_stat: StatType,
    bounds: BoundConfig,
    function: Box<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl BoundRatioImpact {
    pub fn new<F>(bound_stat: impl Into<StatType>, bounds: BoundConfig, function: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            bound_stat: bound_stat.into(),
            bounds,
            function: Box::new(function),
        }
    }
}

impl Impact for BoundRatioImpact {
    fn calculate_impact(&self, ctx: &EffectContext<'_>, _stat: &StatType) -> f64 {
        let ratio =
            calculate_bounds(self.bound_stat.clone(), &self.bounds, &ctx.current_stats).ratio();
        (self.function)(ratio)
    }

    fn description(&self) -> String {
        format!("f(ratio({}))", self.bound_stat)
    }
}

/// `delta = current(source) * ratio`.
#[derive(Debug, Clone)]
pub struct ProportionalImpact {
    source: StatType,
    ratio: f64,
}

impl ProportionalImpact {
    pub fn new(source: impl Into<StatType>, ratio: f64) -> Self {
        Self {
            source: source.into(),
            ratio,
        }
    }
}

impl Impact for ProportionalImpact {
    fn calculate_impact(&self, ctx: &EffectContext<'_>, _stat: &StatType) -> f64 {
        ctx.stat(self.source.as_str()) * self.ratio
    }

    fn description(&self) -> String {
        format!("{} × {:.2}", self.source, self.ratio)
    }
}

/// Arbitrary delta function.
pub struct FunctionImpact {
    function: Box<dyn Fn(&EffectContext<'_>, &StatType) -> f64 + Send + Sync>,
    description: String,
}

impl FunctionImpact {
    pub fn new<F>(function: F, description: impl Into<String>) -> Self
    where
        F: Fn(&EffectContext<'_>, &StatType) -> f64 + Send + Sync + 'static,
    {
        Self {
            function: Box::new(function),
            description: description.into(),
        }
    }
}

impl Impact for FunctionImpact {
    fn calculate_impact(&self, ctx: &EffectContext<'_>, stat: &StatType) -> f64 {
        (self.function)(ctx, stat)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat_map::StatMap;

    #[test]
    fn test_fixed() {
        let base = StatMap::new();
        let ctx = EffectContext::new("e", &[], &base, 0);
        assert_eq!(FixedImpact::new(5.0).calculate_impact(&ctx, &"x".into()), 5.0);
    }

    #[test]
    fn test_multiplicative() {
        let base = StatMap::from([("x", 40.0)]);
        let ctx = EffectContext::new("e", &[], &base, 0);
        assert_eq!(MultiplicativeImpact::new(1.5).calculate_impact(&ctx, &"x".into()), 20.0);
        assert_eq!(MultiplicativeImpact::new(0.5).calculate_impact(&ctx, &"x".into()), -20.0);
    }

    #[test]
    fn test_percentage() {
        let base = StatMap::from([("x", 200.0)]);
        let ctx = EffectContext::new("e", &[], &base, 0);
        assert_eq!(PercentageImpact::new(0.1).calculate_impact(&ctx, &"x".into()), 20.0);
    }

    #[test]
    fn test_proportional() {
        let base = StatMap::from([("strength", 12.0)]);
        let ctx = EffectContext::new("e", &[], &base, 0);
        let impact = ProportionalImpact::new("strength", 2.0);
        assert_eq!(impact.calculate_impact(&ctx, &"attack".into()), 24.0);
    }

    #[test]
    fn test_function() {
        let base = StatMap::from([("a", 3.0), ("b", 4.0)]);
        let ctx = EffectContext::new("e", &[], &base, 0);
        let impact = FunctionImpact::new(|ctx, _| ctx.stat("a") * ctx.stat("b"), "a*b");
        assert_eq!(impact.calculate_impact(&ctx, &"c".into()), 12.0);
        assert_eq!(impact.description(), "a*b");
    }

    #[test]
    fn test_impact_reads_working_copy() {
        let base = StatMap::from([("x", 10.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        ctx.current_stats.set("x", 30.0);
        assert_eq!(MultiplicativeImpact::new(2.0).calculate_impact(&ctx, &"x".into()), 30.0);
    }
}
