//! Effects module.
//!
//! An `Effect` is a named, prioritized stat modifier with apply/reverse
//! semantics. `ComposedEffect` is the standard implementation: it binds one
//! policy for each of the four strategy roles.
//!
//! ```text
//! Applicability ──► is it on?        (no → no-op)
//! Target        ──► which stats?
//! Impact        ──► how much?        (per target)
//! Application   ──► mutate the map   (per target)
//! ```

use crate::applicability::{AlwaysApplicable, Applicability};
use crate::application::Application;
use crate::context::EffectContext;
use crate::error::StatError;
use crate::impact::Impact;
use crate::resolver::ActiveEffect;
use crate::stat_type::StatType;
use crate::target::Target;
use serde::{Deserialize, Serialize};

/// Per-stat stacking policy declared by an effect.
///
/// # Examples
///
/// ```rust
/// use statline::StackabilityRule;
///
/// let exclusive = StackabilityRule::exclusive("movement_speed");
/// assert!(!exclusive.stackable);
///
/// let capped = StackabilityRule::capped("poison", 3);
/// assert!(capped.stackable);
/// assert_eq!(capped.max_stack_size, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackabilityRule {
    pub stat_type: StatType,
    pub stackable: bool,
    /// Maximum number of attached effects touching the stat, this one included.
    pub max_stack_size: Option<usize>,
}

impl StackabilityRule {
    /// Stackable without limit.
    pub fn stackable(stat: impl Into<StatType>) -> Self {
        Self {
            stat_type: stat.into(),
            stackable: true,
            max_stack_size: None,
        }
    }

    /// Refuses to coexist with another non-stackable effect on the stat.
    pub fn exclusive(stat: impl Into<StatType>) -> Self {
        Self {
            stat_type: stat.into(),
            stackable: false,
            max_stack_size: None,
        }
    }

    /// Stackable up to `max` effects on the stat.
    pub fn capped(stat: impl Into<StatType>, max: usize) -> Self {
        Self {
            stat_type: stat.into(),
            stackable: true,
            max_stack_size: Some(max),
        }
    }
}

/// A composable stat modifier.
///
/// Effects mutate the context's working copy (`ctx.current_stats`) in
/// `apply`, and undo that in `reverse`. Lower `priority` is applied
/// earlier.
pub trait Effect: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn priority(&self) -> i32;

    /// Stats this effect may touch.
    fn stat_types(&self) -> &[StatType];

    fn stackability_rules(&self) -> &[StackabilityRule];

    fn apply(&self, ctx: &mut EffectContext<'_>);

    fn reverse(&self, ctx: &mut EffectContext<'_>);

    /// Whether the effect takes part in the current pass.
    fn is_active(&self, ctx: &EffectContext<'_>) -> bool;

    /// `true` unless both effects declare `stat` non-stackable.
    fn can_stack_with(&self, other: &dyn Effect, stat: &StatType) -> bool {
        !(declares_exclusive(self.stackability_rules(), stat)
            && declares_exclusive(other.stackability_rules(), stat))
    }

    /// The maximum stack size this effect declares for `stat`, if any.
    fn max_stack_size(&self, stat: &StatType) -> Option<usize> {
        self.stackability_rules()
            .iter()
            .find(|r| &r.stat_type == stat)
            .and_then(|r| r.max_stack_size)
    }

    /// Value-providing view of this effect, for effects that answer value
    /// requests.
    fn as_active_effect(&self) -> Option<&dyn ActiveEffect> {
        None
    }
}

fn declares_exclusive(rules: &[StackabilityRule], stat: &StatType) -> bool {
    rules.iter().any(|r| &r.stat_type == stat && !r.stackable)
}

/// An effect assembled from four strategy policies.
///
/// Built with [`EffectBuilder`].
pub struct ComposedEffect {
    id: String,
    name: String,
    priority: i32,
    stat_types: Vec<StatType>,
    stackability_rules: Vec<StackabilityRule>,
    applicability: Box<dyn Applicability>,
    impact: Box<dyn Impact>,
    target: Box<dyn Target>,
    application: Box<dyn Application>,
}

impl ComposedEffect {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> EffectBuilder {
        EffectBuilder::new(id, name)
    }

    /// Assemble from policies that are known to be complete.
    pub(crate) fn from_parts(
        id: String,
        name: String,
        priority: i32,
        applicability: Box<dyn Applicability>,
        impact: Box<dyn Impact>,
        target: Box<dyn Target>,
        application: Box<dyn Application>,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            stat_types: target.declared_stats(),
            stackability_rules: Vec::new(),
            applicability,
            impact,
            target,
            application,
        }
    }

    /// One-line description of the composed policies.
    pub fn description(&self) -> String {
        format!(
            "{} [{}] {} via {}",
            self.name,
            self.applicability.description(),
            self.impact.description(),
            self.application.description()
        )
    }
}

impl Effect for ComposedEffect {
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
        &self.stackability_rules
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) {
        if !self.applicability.is_applicable(ctx) {
            return;
        }
        for stat in self.target.targets(ctx) {
            let impact = self.impact.calculate_impact(ctx, &stat);
            self.application
                .apply_impact(&mut ctx.current_stats, &stat, impact);
        }
    }

    fn reverse(&self, ctx: &mut EffectContext<'_>) {
        if !self.applicability.is_applicable(ctx) {
            return;
        }
        // The impact is recomputed from the current context, not remembered
        // from `apply`.
        for stat in self.target.targets(ctx) {
            let impact = self.impact.calculate_impact(ctx, &stat);
            self.application
                .reverse_impact(&mut ctx.current_stats, &stat, impact);
        }
    }

    fn is_active(&self, ctx: &EffectContext<'_>) -> bool {
        self.applicability.is_applicable(ctx)
    }
}

impl std::fmt::Debug for ComposedEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedEffect")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("stat_types", &self.stat_types)
            .field("policies", &format!("<{}>", self.description()))
            .finish()
    }
}

/// Builder for [`ComposedEffect`].
///
/// Impact, target and application are required; applicability defaults to
/// [`AlwaysApplicable`]. `stat_types` defaults to the target's declared
/// stats.
///
/// # Examples
///
/// ```rust
/// use statline::application::AdditiveApplication;
/// use statline::impact::FixedImpact;
/// use statline::target::SingleStatTarget;
/// use statline::{ComposedEffect, Effect, EffectContext, StatError, StatMap};
///
/// let blessing = ComposedEffect::builder("blessing", "Blessing")
///     .priority(10)
///     .impact(FixedImpact::new(5.0))
///     .target(SingleStatTarget::new("armor"))
///     .application(AdditiveApplication)
///     .build()
///     .unwrap();
///
/// let base = StatMap::from([("armor", 20.0)]);
/// let mut ctx = EffectContext::new("hero", &[], &base, 0);
/// blessing.apply(&mut ctx);
/// assert_eq!(ctx.stat("armor"), 25.0);
///
/// let incomplete = ComposedEffect::builder("broken", "Broken")
///     .impact(FixedImpact::new(1.0))
///     .build();
/// assert!(matches!(incomplete, Err(StatError::MissingStrategy { component: "target", .. })));
/// ```
pub struct EffectBuilder {
    id: String,
    name: String,
    priority: i32,
    stat_types: Option<Vec<StatType>>,
    stackability_rules: Vec<StackabilityRule>,
    applicability: Option<Box<dyn Applicability>>,
    impact: Option<Box<dyn Impact>>,
    target: Option<Box<dyn Target>>,
    application: Option<Box<dyn Application>>,
}

impl EffectBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 0,
            stat_types: None,
            stackability_rules: Vec::new(),
            applicability: None,
            impact: None,
            target: None,
            application: None,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn stat_types<I, S>(mut self, stats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatType>,
    {
        self.stat_types = Some(stats.into_iter().map(Into::into).collect());
        self
    }

    pub fn stackability(mut self, rule: StackabilityRule) -> Self {
        self.stackability_rules.push(rule);
        self
    }

    pub fn applicability(mut self, applicability: impl Applicability + 'static) -> Self {
        self.applicability = Some(Box::new(applicability));
        self
    }

    pub fn impact(mut self, impact: impl Impact + 'static) -> Self {
        self.impact = Some(Box::new(impact));
        self
    }

    pub fn target(mut self, target: impl Target + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    pub fn application(mut self, application: impl Application + 'static) -> Self {
        self.application = Some(Box::new(application));
        self
    }

    /// Finish the effect, failing if a required strategy is missing.
    pub fn build(self) -> Result<ComposedEffect, StatError> {
        let missing = |component: &'static str| StatError::MissingStrategy {
            component,
            effect_id: self.id.clone(),
        };
        let impact = self.impact.ok_or_else(|| missing("impact"))?;
        let target = self.target.ok_or_else(|| missing("target"))?;
        let application = self.application.ok_or_else(|| missing("application"))?;
        let applicability = self
            .applicability
            .unwrap_or_else(|| Box::new(AlwaysApplicable));
        let stat_types = self
            .stat_types
            .unwrap_or_else(|| target.declared_stats());

        Ok(ComposedEffect {
            id: self.id,
            name: self.name,
            priority: self.priority,
            stat_types,
            stackability_rules: self.stackability_rules,
            applicability,
            impact,
            target,
            application,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicability::{Comparison, StatThresholdApplicability};
    use crate::application::{AdditiveApplication, MultiplicativeApplication};
    use crate::impact::{FixedImpact, MultiplicativeImpact};
    use crate::stat_map::StatMap;
    use crate::target::{MultiStatTarget, SingleStatTarget};

    fn additive(id: &str, stat: &str, value: f64) -> ComposedEffect {
        ComposedEffect::builder(id, id)
            .impact(FixedImpact::new(value))
            .target(SingleStatTarget::new(stat))
            .application(AdditiveApplication)
            .build()
            .unwrap()
    }

    #[test]
    fn test_apply_reverse_round_trip() {
        let effect = additive("plus5", "x", 5.0);
        let base = StatMap::from([("x", 10.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        effect.apply(&mut ctx);
        assert_eq!(ctx.stat("x"), 15.0);
        effect.reverse(&mut ctx);
        assert_eq!(ctx.stat("x"), 10.0);
    }

    #[test]
    fn test_multiplicative_round_trip_is_exact() {
        let effect = ComposedEffect::builder("haste", "Haste")
            .impact(MultiplicativeImpact::new(1.5))
            .target(SingleStatTarget::new("speed"))
            .application(MultiplicativeApplication)
            .build()
            .unwrap();
        let base = StatMap::from([("speed", 10.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        effect.apply(&mut ctx);
        assert_eq!(ctx.stat("speed"), 15.0);
        effect.reverse(&mut ctx);
        assert_eq!(ctx.stat("speed"), 10.0);
    }

    #[test]
    fn test_inapplicable_is_noop() {
        let effect = ComposedEffect::builder("low_hp", "Desperation")
            .applicability(StatThresholdApplicability::new("health", Comparison::LessThan, 10.0))
            .impact(FixedImpact::new(50.0))
            .target(SingleStatTarget::new("damage"))
            .application(AdditiveApplication)
            .build()
            .unwrap();
        let base = StatMap::from([("health", 80.0), ("damage", 10.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        assert!(!effect.is_active(&ctx));
        effect.apply(&mut ctx);
        assert_eq!(ctx.stat("damage"), 10.0);
    }

    #[test]
    fn test_multi_target_and_new_keys() {
        let effect = ComposedEffect::builder("aura", "Aura")
            .impact(FixedImpact::new(2.0))
            .target(MultiStatTarget::new(["a", "b"]))
            .application(AdditiveApplication)
            .build()
            .unwrap();
        assert_eq!(effect.stat_types().len(), 2);
        let base = StatMap::from([("a", 1.0)]);
        let mut ctx = EffectContext::new("e", &[], &base, 0);
        effect.apply(&mut ctx);
        assert_eq!(ctx.stat("a"), 3.0);
        assert_eq!(ctx.stat("b"), 2.0);
    }

    #[test]
    fn test_builder_missing_components() {
        let err = ComposedEffect::builder("x", "x")
            .target(SingleStatTarget::new("x"))
            .application(AdditiveApplication)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            StatError::MissingStrategy {
                component: "impact",
                effect_id: "x".to_string()
            }
        );

        let err = ComposedEffect::builder("y", "y")
            .impact(FixedImpact::new(1.0))
            .target(SingleStatTarget::new("y"))
            .build()
            .unwrap_err();
        assert!(matches!(err, StatError::MissingStrategy { component: "application", .. }));
    }

    #[test]
    fn test_explicit_stat_types_override_target() {
        let effect = ComposedEffect::builder("z", "z")
            .impact(FixedImpact::new(1.0))
            .target(SingleStatTarget::new("a"))
            .application(AdditiveApplication)
            .stat_types(["a", "shadow"])
            .build()
            .unwrap();
        assert_eq!(effect.stat_types()[1].as_str(), "shadow");
    }

    #[test]
    fn test_can_stack_with() {
        let exclusive = |id: &str| {
            ComposedEffect::builder(id, id)
                .impact(FixedImpact::new(1.0))
                .target(SingleStatTarget::new("speed"))
                .application(AdditiveApplication)
                .stackability(StackabilityRule::exclusive("speed"))
                .build()
                .unwrap()
        };
        let a = exclusive("a");
        let b = exclusive("b");
        let plain = additive("plain", "speed", 1.0);
        let speed = StatType::new("speed");

        assert!(!a.can_stack_with(&b, &speed));
        assert!(a.can_stack_with(&plain, &speed));
        assert!(plain.can_stack_with(&a, &speed));
        assert!(a.can_stack_with(&b, &StatType::new("other")));
    }

    #[test]
    fn test_max_stack_size_lookup() {
        let effect = ComposedEffect::builder("p", "p")
            .impact(FixedImpact::new(1.0))
            .target(SingleStatTarget::new("poison"))
            .application(AdditiveApplication)
            .stackability(StackabilityRule::capped("poison", 3))
            .build()
            .unwrap();
        assert_eq!(effect.max_stack_size(&StatType::new("poison")), Some(3));
        assert_eq!(effect.max_stack_size(&StatType::new("other")), None);
    }
}
