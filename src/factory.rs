//! Effect factory module.
//!
//! Ready-made recipes for the common effect shapes, plus the two wrapper
//! effects the conditional recipes produce:
//!
//! - [`GatedEffect`]: delegates to an inner effect while a gate holds
//! - [`BoundStateEffect`]: dispatches to the effect mapped to a stat's
//!   current bound state
//!
//! | Recipe | Impact | Application |
//! |---|---|---|
//! | `additive` | fixed | add |
//! | `multiplicative` | `current * (factor - 1)` | multiply |
//! | `percentage` | `current * pct` | multiply |
//! | `set_value` | fixed `0` | set to value |
//! | `bound_based` | `f(ratio(bound_stat))` | add |
//!
//! All simple recipes are always applicable and target one stat.

use crate::applicability::{
    AlwaysApplicable, Applicability, BoundRatioApplicability, Comparison,
    PredicateApplicability, StatThresholdApplicability,
};
use crate::application::{AdditiveApplication, MultiplicativeApplication, SetValueApplication};
use crate::bound::{calculate_bounds, BoundConfig, BoundState, BoundThresholds, DEFAULT_TOLERANCE};
use crate::context::EffectContext;
use crate::effect::{ComposedEffect, Effect, EffectBuilder, StackabilityRule};
use crate::impact::{BoundRatioImpact, FixedImpact, MultiplicativeImpact, PercentageImpact};
use crate::stat_type::StatType;
use crate::target::SingleStatTarget;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructors for the standard effect recipes.
///
/// # Examples
///
/// ```rust
/// use statline::factory::EffectFactory;
/// use statline::{StatEntity, StatMap};
/// use std::sync::Arc;
///
/// let mut hero = StatEntity::new("hero", StatMap::from([("speed", 10.0)]));
/// hero.add_effect(Arc::new(EffectFactory::multiplicative("haste", "Haste", "speed", 1.5, 0)), None)
///     .unwrap();
/// hero.add_effect(Arc::new(EffectFactory::additive("boots", "Boots", "speed", 2.0, 10)), None)
///     .unwrap();
///
/// // Priority 0 first: 10 * 1.5 = 15, then + 2.
/// assert_eq!(hero.get_stat("speed"), 17.0);
/// ```
pub struct EffectFactory;

impl EffectFactory {
    /// `stat += value`.
    pub fn additive(
        id: impl Into<String>,
        name: impl Into<String>,
        stat: impl Into<StatType>,
        value: f64,
        priority: i32,
    ) -> ComposedEffect {
        simple(
            id,
            name,
            stat,
            priority,
            Box::new(FixedImpact::new(value)),
            Box::new(AdditiveApplication),
        )
    }

    /// The additive recipe as a builder, for adding stackability rules or
    /// a gate before building.
    pub fn builder_additive(
        id: impl Into<String>,
        name: impl Into<String>,
        stat: impl Into<StatType>,
        value: f64,
        priority: i32,
    ) -> EffectBuilder {
        EffectBuilder::new(id, name)
            .priority(priority)
            .impact(FixedImpact::new(value))
            .target(SingleStatTarget::new(stat))
            .application(AdditiveApplication)
    }

    /// `stat *= factor`. Reverses exactly.
    pub fn multiplicative(
        id: impl Into<String>,
        name: impl Into<String>,
        stat: impl Into<StatType>,
        factor: f64,
        priority: i32,
    ) -> ComposedEffect {
        simple(
            id,
            name,
            stat,
            priority,
            Box::new(MultiplicativeImpact::new(factor)),
            Box::new(MultiplicativeApplication),
        )
    }

    /// `stat *= 1 + pct`, with `pct` a fraction (`0.2` is +20%).
    pub fn percentage(
        id: impl Into<String>,
        name: impl Into<String>,
        stat: impl Into<StatType>,
        pct: f64,
        priority: i32,
    ) -> ComposedEffect {
        simple(
            id,
            name,
            stat,
            priority,
            Box::new(PercentageImpact::new(pct)),
            Box::new(MultiplicativeApplication),
        )
    }

    /// `stat = value`. Reversing resets the stat to `value` as well.
    pub fn set_value(
        id: impl Into<String>,
        name: impl Into<String>,
        stat: impl Into<StatType>,
        value: f64,
        priority: i32,
    ) -> ComposedEffect {
        simple(
            id,
            name,
            stat,
            priority,
            Box::new(FixedImpact::new(0.0)),
            Box::new(SetValueApplication::new(value)),
        )
    }

    /// `target_stat += f(ratio)`, where `ratio` is `bound_stat`'s position
    /// in `bounds`.
    pub fn bound_based<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        target_stat: impl Into<StatType>,
        bound_stat: impl Into<StatType>,
        bounds: BoundConfig,
        function: F,
        priority: i32,
    ) -> ComposedEffect
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        simple(
            id,
            name,
            target_stat,
            priority,
            Box::new(BoundRatioImpact::new(bound_stat, bounds, function)),
            Box::new(AdditiveApplication),
        )
    }

    /// Wrap `inner` behind a predicate over the pass context.
    pub fn conditional<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        inner: Arc<dyn Effect>,
        predicate: F,
    ) -> GatedEffect
    where
        F: Fn(&EffectContext<'_>) -> bool + Send + Sync + 'static,
    {
        GatedEffect::new(
            id,
            name,
            PredicateApplicability::new(predicate, "predicate"),
            inner,
        )
    }

    /// Wrap `inner` behind a predicate over `bound_stat`'s ratio.
    pub fn bound_conditional<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        bound_stat: impl Into<StatType>,
        bounds: BoundConfig,
        predicate: F,
        inner: Arc<dyn Effect>,
    ) -> GatedEffect
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        GatedEffect::new(
            id,
            name,
            BoundRatioApplicability::new(bound_stat, bounds, predicate),
            inner,
        )
    }

    /// Wrap `inner` behind `stat <comparison> threshold`.
    pub fn stat_threshold_conditional(
        id: impl Into<String>,
        name: impl Into<String>,
        stat: impl Into<StatType>,
        comparison: Comparison,
        threshold: f64,
        inner: Arc<dyn Effect>,
    ) -> GatedEffect {
        GatedEffect::new(
            id,
            name,
            StatThresholdApplicability::new(stat, comparison, threshold),
            inner,
        )
    }

    /// Dispatch to the effect mapped to `bound_stat`'s current state.
    pub fn bound_state_dispatch(
        id: impl Into<String>,
        name: impl Into<String>,
        bound_stat: impl Into<StatType>,
        bounds: BoundConfig,
        effects: HashMap<BoundState, Arc<dyn Effect>>,
        priority: i32,
    ) -> BoundStateEffect {
        BoundStateEffect::new(id, name, bound_stat, bounds, effects).with_priority(priority)
    }
}

fn simple(
    id: impl Into<String>,
    name: impl Into<String>,
    stat: impl Into<StatType>,
    priority: i32,
    impact: Box<dyn crate::impact::Impact>,
    application: Box<dyn crate::application::Application>,
) -> ComposedEffect {
    ComposedEffect::from_parts(
        id.into(),
        name.into(),
        priority,
        Box::new(AlwaysApplicable),
        impact,
        Box::new(SingleStatTarget::new(stat)),
        application,
    )
}

/// Delegates to an inner effect while a gate holds.
///
/// Stat types and stackability come from the inner effect. Priority does
/// too, unless overridden with [`GatedEffect::with_priority`].
///
/// # Examples
///
/// ```rust
/// use statline::applicability::Comparison;
/// use statline::factory::EffectFactory;
/// use statline::{StatEntity, StatMap};
/// use std::sync::Arc;
///
/// let rage = EffectFactory::stat_threshold_conditional(
///     "last_stand",
///     "Last Stand",
///     "health",
///     Comparison::LessThan,
///     30.0,
///     Arc::new(EffectFactory::additive("last_stand_bonus", "Bonus", "damage", 20.0, 0)),
/// );
///
/// let mut hero = StatEntity::new("hero", StatMap::from([("health", 80.0), ("damage", 10.0)]));
/// hero.add_effect(Arc::new(rage), None).unwrap();
/// assert_eq!(hero.get_stat("damage"), 10.0);
///
/// hero.set_base_stat("health", 20.0);
/// assert_eq!(hero.get_stat("damage"), 30.0);
/// ```
pub struct GatedEffect {
    id: String,
    name: String,
    priority: i32,
    gate: Box<dyn Applicability>,
    inner: Arc<dyn Effect>,
}

impl GatedEffect {
    /// Gate `inner` behind `gate`. Priority defaults to the inner effect's.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        gate: impl Applicability + 'static,
        inner: Arc<dyn Effect>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: inner.priority(),
            gate: Box::new(gate),
            inner,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The gated effect.
    pub fn inner(&self) -> &Arc<dyn Effect> {
        &self.inner
    }
}

impl Effect for GatedEffect {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn stat_types(&self) -> &[StatType] {
        self.inner.stat_types()
    }

    fn stackability_rules(&self) -> &[StackabilityRule] {
        self.inner.stackability_rules()
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) {
        if self.gate.is_applicable(ctx) {
            self.inner.apply(ctx);
        }
    }

    fn reverse(&self, ctx: &mut EffectContext<'_>) {
        if self.gate.is_applicable(ctx) {
            self.inner.reverse(ctx);
        }
    }

    fn is_active(&self, ctx: &EffectContext<'_>) -> bool {
        self.gate.is_applicable(ctx) && self.inner.is_active(ctx)
    }
}

impl std::fmt::Debug for GatedEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedEffect")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("gate", &self.gate.description())
            .field("inner", &self.inner.id())
            .finish()
    }
}

/// Applies the effect mapped to a stat's bound state at call time.
///
/// The state is recomputed on every `apply` and `reverse`, so if the
/// state moved in between, `reverse` undoes a different effect than the
/// one applied. An unmapped state is a no-op.
///
/// # Examples
///
/// ```rust
/// use statline::bound::{BoundConfig, BoundState};
/// use statline::factory::EffectFactory;
/// use statline::{Effect, EffectContext, StatMap};
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// let mut by_state: HashMap<BoundState, Arc<dyn Effect>> = HashMap::new();
/// by_state.insert(
///     BoundState::Critical,
///     Arc::new(EffectFactory::additive("panic", "Panic", "speed", 5.0, 0)),
/// );
///
/// let adrenaline = EffectFactory::bound_state_dispatch(
///     "adrenaline", "Adrenaline", "health", BoundConfig::range(0.0, 100.0), by_state, 0,
/// );
///
/// let base = StatMap::from([("health", 10.0), ("speed", 10.0)]);
/// let mut ctx = EffectContext::new("hero", &[], &base, 0);
/// adrenaline.apply(&mut ctx);
/// assert_eq!(ctx.stat("speed"), 15.0);
/// ```
pub struct BoundStateEffect {
    id: String,
    name: String,
    priority: i32,
    bound_stat: StatType,
    bounds: BoundConfig,
    thresholds: BoundThresholds,
    tolerance: f64,
    effects: HashMap<BoundState, Arc<dyn Effect>>,
    stat_types: Vec<StatType>,
}

impl BoundStateEffect {
    /// Map each state of `bound_stat` within `bounds` to an effect.
    /// Priority starts at `0`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bound_stat: impl Into<StatType>,
        bounds: BoundConfig,
        effects: HashMap<BoundState, Arc<dyn Effect>>,
    ) -> Self {
        let mut stat_types: Vec<StatType> = Vec::new();
        for effect in effects.values() {
            for stat in effect.stat_types() {
                if !stat_types.contains(stat) {
                    stat_types.push(stat.clone());
                }
            }
        }
        stat_types.sort();

        Self {
            id: id.into(),
            name: name.into(),
            priority: 0,
            bound_stat: bound_stat.into(),
            bounds,
            thresholds: BoundThresholds::default(),
            tolerance: DEFAULT_TOLERANCE,
            effects,
            stat_types,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_thresholds(mut self, thresholds: BoundThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// The bound state of the watched stat in `ctx`.
    pub fn current_state(&self, ctx: &EffectContext<'_>) -> BoundState {
        calculate_bounds(self.bound_stat.clone(), &self.bounds, &ctx.current_stats)
            .state(&self.thresholds, self.tolerance)
    }

    fn selected(&self, ctx: &EffectContext<'_>) -> Option<&Arc<dyn Effect>> {
        self.effects.get(&self.current_state(ctx))
    }
}

impl Effect for BoundStateEffect {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn stat_types(&self) -> &[StatType] {
        &self.stat_types
    }

    fn stackability_rules(&self) -> &[StackabilityRule] {
        &[]
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) {
        if let Some(effect) = self.selected(ctx).cloned() {
            tracing::trace!(effect = %self.id, selected = %effect.id(), "bound state dispatch");
            effect.apply(ctx);
        }
    }

    fn reverse(&self, ctx: &mut EffectContext<'_>) {
        if let Some(effect) = self.selected(ctx).cloned() {
            effect.reverse(ctx);
        }
    }

    /// Active while the current state has a mapped effect.
    fn is_active(&self, ctx: &EffectContext<'_>) -> bool {
        self.selected(ctx).is_some_and(|effect| effect.is_active(ctx))
    }
}

impl std::fmt::Debug for BoundStateEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut mapped: Vec<(&str, &str)> = self
            .effects
            .iter()
            .map(|(state, effect)| (state.as_str(), effect.id()))
            .collect();
        mapped.sort();
        f.debug_struct("BoundStateEffect")
            .field("id", &self.id)
            .field("bound_stat", &self.bound_stat)
            .field("effects", &mapped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat_map::StatMap;

    fn run(effect: &dyn Effect, base: &StatMap) -> StatMap {
        let mut ctx = EffectContext::new("e", &[], base, 0);
        effect.apply(&mut ctx);
        ctx.into_stats()
    }

    #[test]
    fn test_simple_recipes() {
        let base = StatMap::from([("x", 10.0)]);
        assert_eq!(run(&EffectFactory::additive("a", "a", "x", 5.0, 0), &base).get("x"), 15.0);
        assert_eq!(
            run(&EffectFactory::multiplicative("m", "m", "x", 2.0, 0), &base).get("x"),
            20.0
        );
        assert_eq!(run(&EffectFactory::percentage("p", "p", "x", 0.5, 0), &base).get("x"), 15.0);
        assert_eq!(run(&EffectFactory::set_value("s", "s", "x", 3.0, 0), &base).get("x"), 3.0);
    }

    #[test]
    fn test_percentage_reverse_exact() {
        let effect = EffectFactory::percentage("p", "p", "x", 0.2, 0);
        let base = StatMap::from([("x", 50.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        effect.apply(&mut ctx);
        assert_eq!(ctx.stat("x"), 60.0);
        effect.reverse(&mut ctx);
        assert_eq!(ctx.stat("x"), 50.0);
    }

    #[test]
    fn test_set_value_reverse_resets() {
        let effect = EffectFactory::set_value("s", "s", "x", 50.0, 0);
        let base = StatMap::from([("x", 7.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        effect.apply(&mut ctx);
        effect.reverse(&mut ctx);
        assert_eq!(ctx.stat("x"), 50.0);
    }

    #[test]
    fn test_bound_based() {
        let effect = EffectFactory::bound_based(
            "b",
            "b",
            "damage",
            "health",
            BoundConfig::range(0.0, 100.0),
            |ratio| (1.0 - ratio) * 10.0,
            0,
        );
        let base = StatMap::from([("health", 25.0), ("damage", 1.0)]);
        assert_eq!(run(&effect, &base).get("damage"), 8.5);
    }

    #[test]
    fn test_conditional_reuses_inner_metadata() {
        let inner: Arc<dyn Effect> = Arc::new(
            EffectFactory::builder_additive("i", "i", "x", 1.0, 7)
                .stackability(StackabilityRule::exclusive("x"))
                .build()
                .unwrap(),
        );
        let gated = EffectFactory::conditional("g", "g", inner, |ctx| ctx.stat("flag") > 0.0);
        assert_eq!(gated.priority(), 7);
        assert_eq!(gated.stat_types(), &[StatType::new("x")]);
        assert_eq!(gated.stackability_rules().len(), 1);

        let off = StatMap::from([("x", 1.0)]);
        assert_eq!(run(&gated, &off).get("x"), 1.0);
        let on = StatMap::from([("x", 1.0), ("flag", 1.0)]);
        assert_eq!(run(&gated, &on).get("x"), 2.0);
        assert_eq!(gated.with_priority(-1).priority(), -1);
    }

    #[test]
    fn test_bound_conditional() {
        let gated = EffectFactory::bound_conditional(
            "low",
            "Low",
            "health",
            BoundConfig::range(0.0, 200.0),
            |ratio| ratio < 0.5,
            Arc::new(EffectFactory::additive("armor", "Armor", "armor", 10.0, 0)),
        );
        let healthy = StatMap::from([("health", 150.0)]);
        assert_eq!(run(&gated, &healthy).get("armor"), 0.0);
        let hurt = StatMap::from([("health", 50.0)]);
        assert_eq!(run(&gated, &hurt).get("armor"), 10.0);
    }

    #[test]
    fn test_bound_state_dispatch_unmapped_noop() {
        let mut by_state: HashMap<BoundState, Arc<dyn Effect>> = HashMap::new();
        by_state.insert(
            BoundState::High,
            Arc::new(EffectFactory::additive("h", "h", "speed", 1.0, 0)),
        );
        by_state.insert(
            BoundState::Low,
            Arc::new(EffectFactory::additive("l", "l", "armor", 1.0, 0)),
        );
        let effect = EffectFactory::bound_state_dispatch(
            "d",
            "d",
            "health",
            BoundConfig::range(0.0, 100.0),
            by_state,
            3,
        );
        assert_eq!(effect.priority(), 3);
        assert_eq!(
            effect.stat_types(),
            &[StatType::new("armor"), StatType::new("speed")]
        );

        let normal = StatMap::from([("health", 60.0)]);
        let ctx = EffectContext::new("e", &[], &normal, 0);
        assert_eq!(effect.current_state(&ctx), BoundState::Normal);
        assert!(!effect.is_active(&ctx));
        let out = run(&effect, &normal);
        assert_eq!(out.get("speed"), 0.0);
        assert_eq!(out.get("armor"), 0.0);

        let low = StatMap::from([("health", 40.0)]);
        assert_eq!(run(&effect, &low).get("armor"), 1.0);
    }
}
