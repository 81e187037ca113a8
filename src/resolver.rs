//! Value resolution module.
//!
//! Answers "give me a value for purpose X" requests. Three kinds of
//! candidate share one priority namespace:
//!
//! - equipped [`Gear`]
//! - active [`ValueProvider`]s
//! - attached effects exposing an [`ActiveEffect`] view
//!
//! Candidates are consulted in descending priority and the first one that
//! answers wins. Lower-priority candidates are never called once a
//! higher-priority one has answered, even if they would return a larger
//! number.
//!
//! The resolver defines no purposes of its own. Purpose strings belong to
//! the caller.

use crate::context::{EffectContext, RequestParameters};
use crate::effect::{Effect, StackabilityRule};
use crate::stat_map::{StatMap, StatValue};
use crate::stat_type::StatType;
use std::sync::Arc;

/// The shared context for one value request.
///
/// Built once per request and handed to every candidate.
#[derive(Clone)]
pub struct ValueRequestContext {
    pub entity_id: String,
    pub request_id: String,
    pub purpose: String,
    pub timestamp: u64,
    pub parameters: Option<RequestParameters>,
    pub base_stats: StatMap,
    pub current_stats: StatMap,
    /// Every attached effect, in attachment order.
    pub active_effects: Vec<Arc<dyn Effect>>,
}

impl ValueRequestContext {
    /// Current value of a stat, `0.0` if absent.
    pub fn stat(&self, stat: &str) -> StatValue {
        self.current_stats.get(stat)
    }

    /// A caller parameter, `None` if absent, of the wrong shape, or if the
    /// request carried no parameters.
    pub fn parameter<T: for<'de> serde::Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.parameters.as_ref().and_then(|p| p.get(key))
    }
}

impl std::fmt::Debug for ValueRequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueRequestContext")
            .field("entity_id", &self.entity_id)
            .field("request_id", &self.request_id)
            .field("purpose", &self.purpose)
            .field("timestamp", &self.timestamp)
            .field("parameters", &self.parameters)
            .field("current_stats", &self.current_stats)
            .field(
                "active_effects",
                &self.active_effects.iter().map(|e| e.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Which kind of candidate answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gear,
    Provider,
    Effect,
}

/// The winning answer to a value request.
#[derive(Debug, Clone)]
pub struct ValueRequestResult {
    pub value: StatValue,
    pub provider_id: String,
    pub provider_kind: ProviderKind,
    pub purpose: String,
    pub timestamp: u64,
    pub context: ValueRequestContext,
}

/// Equipment that can answer value requests while equipped.
pub trait Gear: Send + Sync {
    /// Unique among registered gear.
    fn id(&self) -> &str;

    fn priority(&self) -> i32;

    fn supported_purposes(&self) -> &[String];

    fn can_handle_purpose(&self, purpose: &str) -> bool {
        self.supported_purposes().iter().any(|p| p == purpose)
    }

    /// `None` passes the request to the next candidate.
    fn provide_value(&self, purpose: &str, ctx: &ValueRequestContext) -> Option<StatValue>;

    /// Unequipped gear is never consulted.
    fn is_equipped(&self) -> bool;

    /// Effects the gear grants while worn. Attaching them is the equip
    /// layer's job; the resolver never reads this.
    fn passive_effects(&self) -> Vec<Arc<dyn Effect>> {
        Vec::new()
    }
}

/// An explicitly registered value source.
pub trait ValueProvider: Send + Sync {
    fn id(&self) -> &str;

    fn priority(&self) -> i32;

    fn supported_purposes(&self) -> &[String];

    fn can_handle_purpose(&self, purpose: &str) -> bool {
        self.supported_purposes().iter().any(|p| p == purpose)
    }

    /// `None` passes the request to the next candidate.
    fn provide_value(&self, purpose: &str, ctx: &ValueRequestContext) -> Option<StatValue>;

    /// Inactive providers are never consulted.
    fn is_active(&self) -> bool;
}

/// An effect that also answers value requests.
///
/// Expose it to the resolver by returning `Some(self)` from
/// [`Effect::as_active_effect`].
pub trait ActiveEffect: Effect {
    fn supported_purposes(&self) -> &[String];

    fn provide_value(&self, purpose: &str, ctx: &ValueRequestContext) -> Option<StatValue>;

    fn is_active_for_purpose(&self, _purpose: &str, _ctx: &ValueRequestContext) -> bool {
        true
    }
}

enum Candidate<'a> {
    Gear(&'a dyn Gear),
    Provider(&'a dyn ValueProvider),
    Effect(&'a dyn ActiveEffect),
}

impl Candidate<'_> {
    fn id(&self) -> &str {
        match self {
            Candidate::Gear(g) => g.id(),
            Candidate::Provider(p) => p.id(),
            Candidate::Effect(e) => e.id(),
        }
    }

    fn priority(&self) -> i32 {
        match self {
            Candidate::Gear(g) => g.priority(),
            Candidate::Provider(p) => p.priority(),
            Candidate::Effect(e) => e.priority(),
        }
    }

    fn kind(&self) -> ProviderKind {
        match self {
            Candidate::Gear(_) => ProviderKind::Gear,
            Candidate::Provider(_) => ProviderKind::Provider,
            Candidate::Effect(_) => ProviderKind::Effect,
        }
    }

    fn provide_value(&self, purpose: &str, ctx: &ValueRequestContext) -> Option<StatValue> {
        match self {
            Candidate::Gear(g) => g.provide_value(purpose, ctx),
            Candidate::Provider(p) => p.provide_value(purpose, ctx),
            Candidate::Effect(e) => e.provide_value(purpose, ctx),
        }
    }
}

/// The winner of a resolution, before it is wrapped into a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: StatValue,
    pub provider_id: String,
    pub provider_kind: ProviderKind,
}

/// Registry of gear and value providers, plus the ranking logic.
///
/// # Examples
///
/// ```rust
/// use statline::resolver::{ValueProvider, ValueRequestContext};
/// use statline::{StatEntity, StatMap};
/// use std::sync::Arc;
///
/// struct Flat {
///     id: &'static str,
///     priority: i32,
///     value: f64,
///     purposes: Vec<String>,
/// }
///
/// impl ValueProvider for Flat {
///     fn id(&self) -> &str { self.id }
///     fn priority(&self) -> i32 { self.priority }
///     fn supported_purposes(&self) -> &[String] { &self.purposes }
///     fn provide_value(&self, _: &str, _: &ValueRequestContext) -> Option<f64> { Some(self.value) }
///     fn is_active(&self) -> bool { true }
/// }
///
/// let mut hero = StatEntity::new("hero", StatMap::new());
/// let purposes = vec!["damage".to_string()];
/// hero.resolver_mut().register_provider(Arc::new(Flat { id: "sword", priority: 10, value: 5.0, purposes: purposes.clone() }));
/// hero.resolver_mut().register_provider(Arc::new(Flat { id: "club", priority: 5, value: 100.0, purposes }));
///
/// let result = hero.request_value("damage", None).unwrap();
/// assert_eq!(result.value, 5.0);
/// assert_eq!(result.provider_id, "sword");
/// assert!(hero.request_value("healing", None).is_none());
/// ```
#[derive(Default)]
pub struct ValueResolver {
    gear: Vec<Arc<dyn Gear>>,
    providers: Vec<Arc<dyn ValueProvider>>,
}

impl ValueResolver {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register gear. An existing registration with the same id is replaced.
    pub fn register_gear(&mut self, gear: Arc<dyn Gear>) {
        self.gear.retain(|g| g.id() != gear.id());
        self.gear.push(gear);
    }

    /// Remove gear by id. Returns whether it was registered.
    pub fn unregister_gear(&mut self, id: &str) -> bool {
        let before = self.gear.len();
        self.gear.retain(|g| g.id() != id);
        self.gear.len() != before
    }

    /// Register a provider. An existing registration with the same id is
    /// replaced.
    pub fn register_provider(&mut self, provider: Arc<dyn ValueProvider>) {
        self.providers.retain(|p| p.id() != provider.id());
        self.providers.push(provider);
    }

    /// Remove a provider by id. Returns whether it was registered.
    pub fn unregister_provider(&mut self, id: &str) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| p.id() != id);
        self.providers.len() != before
    }

    /// Registered gear, in registration order.
    pub fn gear(&self) -> &[Arc<dyn Gear>] {
        &self.gear
    }

    /// Registered providers, in registration order.
    pub fn providers(&self) -> &[Arc<dyn ValueProvider>] {
        &self.providers
    }

    /// Rank the capable candidates for `ctx.purpose` and return the first
    /// answer.
    ///
    /// Ties on priority keep source order (gear, providers, effects) and
    /// then registration order. A `NaN` answer counts as no answer.
    pub fn resolve(&self, ctx: &ValueRequestContext) -> Option<Resolution> {
        let purpose = ctx.purpose.as_str();
        let mut candidates: Vec<Candidate<'_>> = Vec::new();

        candidates.extend(
            self.gear
                .iter()
                .filter(|g| g.can_handle_purpose(purpose) && g.is_equipped())
                .map(|g| Candidate::Gear(g.as_ref())),
        );
        candidates.extend(
            self.providers
                .iter()
                .filter(|p| p.can_handle_purpose(purpose) && p.is_active())
                .map(|p| Candidate::Provider(p.as_ref())),
        );
        candidates.extend(
            ctx.active_effects
                .iter()
                .filter_map(|e| e.as_active_effect())
                .filter(|e| {
                    e.supported_purposes().iter().any(|p| p == purpose)
                        && e.is_active_for_purpose(purpose, ctx)
                })
                .map(Candidate::Effect),
        );

        // Stable: equal priorities keep collection order.
        candidates.sort_by(|a, b| b.priority().cmp(&a.priority()));

        for candidate in &candidates {
            tracing::trace!(
                purpose,
                candidate = %candidate.id(),
                priority = candidate.priority(),
                "consulting value candidate"
            );
            match candidate.provide_value(purpose, ctx) {
                Some(value) if !value.is_nan() => {
                    tracing::debug!(
                        entity = %ctx.entity_id,
                        purpose,
                        provider = %candidate.id(),
                        value,
                        "value request answered"
                    );
                    return Some(Resolution {
                        value,
                        provider_id: candidate.id().to_string(),
                        provider_kind: candidate.kind(),
                    });
                }
                _ => continue,
            }
        }

        tracing::debug!(
            entity = %ctx.entity_id,
            purpose,
            candidates = candidates.len(),
            "value request unanswered"
        );
        None
    }
}

impl std::fmt::Debug for ValueResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueResolver")
            .field("gear", &self.gear.iter().map(|g| g.id()).collect::<Vec<_>>())
            .field(
                "providers",
                &self.providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

type PurposeValueFn = dyn Fn(&str, &ValueRequestContext) -> Option<StatValue> + Send + Sync;
type PurposeGateFn = dyn Fn(&str, &ValueRequestContext) -> bool + Send + Sync;

/// Wraps any effect so it also answers value requests.
///
/// Stat behavior is delegated to the wrapped effect unchanged.
///
/// # Examples
///
/// ```rust
/// use statline::factory::EffectFactory;
/// use statline::resolver::PurposeEffect;
/// use statline::{StatEntity, StatMap};
/// use std::sync::Arc;
///
/// let rage = PurposeEffect::new(
///     Arc::new(EffectFactory::additive("rage", "Rage", "strength", 5.0, 20)),
///     ["damage"],
///     |_, ctx| Some(ctx.stat("strength") * 2.0),
/// );
///
/// let mut hero = StatEntity::new("hero", StatMap::from([("strength", 10.0)]));
/// hero.add_effect(Arc::new(rage), None).unwrap();
///
/// let result = hero.request_value("damage", None).unwrap();
/// assert_eq!(result.value, 30.0);
/// assert_eq!(result.provider_id, "rage");
/// ```
pub struct PurposeEffect {
    inner: Arc<dyn Effect>,
    purposes: Vec<String>,
    value: Box<PurposeValueFn>,
    gate: Option<Box<PurposeGateFn>>,
}

impl PurposeEffect {
    /// Wrap `inner`, answering `purposes` through `value`.
    pub fn new<I, S, F>(inner: Arc<dyn Effect>, purposes: I, value: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &ValueRequestContext) -> Option<StatValue> + Send + Sync + 'static,
    {
        Self {
            inner,
            purposes: purposes.into_iter().map(Into::into).collect(),
            value: Box::new(value),
            gate: None,
        }
    }

    /// Only answer while `gate` holds.
    pub fn with_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&str, &ValueRequestContext) -> bool + Send + Sync + 'static,
    {
        self.gate = Some(Box::new(gate));
        self
    }

    /// The wrapped effect.
    pub fn inner(&self) -> &Arc<dyn Effect> {
        &self.inner
    }
}

impl Effect for PurposeEffect {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self) -> i32 {
        self.inner.priority()
    }

    fn stat_types(&self) -> &[StatType] {
        self.inner.stat_types()
    }

    fn stackability_rules(&self) -> &[StackabilityRule] {
        self.inner.stackability_rules()
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) {
        self.inner.apply(ctx);
    }

    fn reverse(&self, ctx: &mut EffectContext<'_>) {
        self.inner.reverse(ctx);
    }

    fn is_active(&self, ctx: &EffectContext<'_>) -> bool {
        self.inner.is_active(ctx)
    }

    fn as_active_effect(&self) -> Option<&dyn ActiveEffect> {
        Some(self)
    }
}

impl ActiveEffect for PurposeEffect {
    fn supported_purposes(&self) -> &[String] {
        &self.purposes
    }

    fn provide_value(&self, purpose: &str, ctx: &ValueRequestContext) -> Option<StatValue> {
        (self.value)(purpose, ctx)
    }

    fn is_active_for_purpose(&self, purpose: &str, ctx: &ValueRequestContext) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate(purpose, ctx))
    }
}

impl std::fmt::Debug for PurposeEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurposeEffect")
            .field("id", &self.inner.id())
            .field("purposes", &self.purposes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::EffectFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestGear {
        id: String,
        priority: i32,
        equipped: bool,
        value: Option<f64>,
        purposes: Vec<String>,
        calls: AtomicUsize,
    }

    impl TestGear {
        fn new(id: &str, priority: i32, value: Option<f64>) -> Self {
            Self {
                id: id.to_string(),
                priority,
                equipped: true,
                value,
                purposes: vec!["damage".to_string()],
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Gear for TestGear {
        fn id(&self) -> &str {
            &self.id
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn supported_purposes(&self) -> &[String] {
            &self.purposes
        }
        fn provide_value(&self, _: &str, _: &ValueRequestContext) -> Option<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.value
        }
        fn is_equipped(&self) -> bool {
            self.equipped
        }
    }

    fn ctx(purpose: &str, effects: Vec<Arc<dyn Effect>>) -> ValueRequestContext {
        ValueRequestContext {
            entity_id: "e".to_string(),
            request_id: "e-0".to_string(),
            purpose: purpose.to_string(),
            timestamp: 0,
            parameters: None,
            base_stats: StatMap::new(),
            current_stats: StatMap::new(),
            active_effects: effects,
        }
    }

    #[test]
    fn test_unequipped_gear_skipped() {
        let mut resolver = ValueResolver::new();
        let mut gear = TestGear::new("off", 100, Some(1.0));
        gear.equipped = false;
        resolver.register_gear(Arc::new(gear));
        resolver.register_gear(Arc::new(TestGear::new("on", 1, Some(2.0))));
        let result = resolver.resolve(&ctx("damage", Vec::new())).unwrap();
        assert_eq!(result.provider_id, "on");
    }

    #[test]
    fn test_falls_through_unanswered() {
        let mut resolver = ValueResolver::new();
        let silent = Arc::new(TestGear::new("silent", 10, None));
        resolver.register_gear(silent.clone());
        resolver.register_gear(Arc::new(TestGear::new("loud", 1, Some(3.0))));
        let result = resolver.resolve(&ctx("damage", Vec::new())).unwrap();
        assert_eq!(result.value, 3.0);
        assert_eq!(silent.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nan_is_not_an_answer() {
        let mut resolver = ValueResolver::new();
        resolver.register_gear(Arc::new(TestGear::new("nan", 10, Some(f64::NAN))));
        assert!(resolver.resolve(&ctx("damage", Vec::new())).is_none());
    }

    #[test]
    fn test_tie_prefers_gear_then_effect_order() {
        let mut resolver = ValueResolver::new();
        resolver.register_gear(Arc::new(TestGear::new("gear", 0, Some(1.0))));
        let effect: Arc<dyn Effect> = Arc::new(PurposeEffect::new(
            Arc::new(EffectFactory::additive("fx", "Fx", "x", 0.0, 0)),
            ["damage"],
            |_, _| Some(2.0),
        ));
        let result = resolver.resolve(&ctx("damage", vec![effect])).unwrap();
        assert_eq!(result.provider_kind, ProviderKind::Gear);
    }

    #[test]
    fn test_effect_gate() {
        let resolver = ValueResolver::new();
        let effect: Arc<dyn Effect> = Arc::new(
            PurposeEffect::new(
                Arc::new(EffectFactory::additive("fx", "Fx", "x", 0.0, 0)),
                ["damage"],
                |_, _| Some(2.0),
            )
            .with_gate(|_, ctx| ctx.parameter::<bool>("armed").unwrap_or(false)),
        );
        let mut request = ctx("damage", vec![effect]);
        assert!(resolver.resolve(&request).is_none());
        request.parameters = Some(RequestParameters::new().with("armed", true));
        assert_eq!(resolver.resolve(&request).unwrap().value, 2.0);
    }

    #[test]
    fn test_register_replaces_and_unregister() {
        let mut resolver = ValueResolver::new();
        resolver.register_gear(Arc::new(TestGear::new("g", 1, Some(1.0))));
        resolver.register_gear(Arc::new(TestGear::new("g", 1, Some(9.0))));
        assert_eq!(resolver.gear().len(), 1);
        assert_eq!(resolver.resolve(&ctx("damage", Vec::new())).unwrap().value, 9.0);
        assert!(resolver.unregister_gear("g"));
        assert!(!resolver.unregister_gear("g"));
        assert!(!resolver.unregister_provider("g"));
    }
}
