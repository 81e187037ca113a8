use statline::resolver::ProviderKind;
use statline::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingProvider {
    id: String,
    priority: i32,
    value: Option<f64>,
    purposes: Vec<String>,
    active: bool,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new(id: &str, priority: i32, value: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            priority,
            value,
            purposes: vec!["damage".to_string()],
            active: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ValueProvider for CountingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supported_purposes(&self) -> &[String] {
        &self.purposes
    }

    fn provide_value(&self, _purpose: &str, _ctx: &ValueRequestContext) -> Option<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.value
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

struct Weapon {
    id: String,
    priority: i32,
    purposes: Vec<String>,
    equipped: bool,
}

impl Gear for Weapon {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supported_purposes(&self) -> &[String] {
        &self.purposes
    }

    /// Damage scales with the wielder's current strength.
    fn provide_value(&self, _purpose: &str, ctx: &ValueRequestContext) -> Option<f64> {
        let bonus = ctx.parameter::<f64>("bonus").unwrap_or(0.0);
        Some(ctx.stat("strength") * 2.0 + bonus)
    }

    fn is_equipped(&self) -> bool {
        self.equipped
    }
}

fn weapon(id: &str, priority: i32, equipped: bool) -> Arc<Weapon> {
    Arc::new(Weapon {
        id: id.to_string(),
        priority,
        purposes: vec!["damage".to_string()],
        equipped,
    })
}

/// The highest-priority answer wins and lower candidates are never called.
#[test]
fn test_first_answer_short_circuits() {
    let mut hero = StatEntity::new("hero", StatMap::new());
    let high = CountingProvider::new("high", 10, Some(5.0));
    let low = CountingProvider::new("low", 5, Some(100.0));
    hero.resolver_mut().register_provider(low.clone());
    hero.resolver_mut().register_provider(high.clone());

    let result = hero.request_value("damage", None).unwrap();
    assert_eq!(result.value, 5.0);
    assert_eq!(result.provider_id, "high");
    assert_eq!(result.provider_kind, ProviderKind::Provider);
    assert_eq!(result.purpose, "damage");
    assert_eq!(high.calls(), 1);
    assert_eq!(low.calls(), 0);
}

/// No capable candidate is "absent", not zero.
#[test]
fn test_unanswered_request_is_absent() {
    let mut hero = StatEntity::new("hero", StatMap::new());
    hero.resolver_mut()
        .register_provider(CountingProvider::new("silent", 1, None));

    assert!(hero.request_value("damage", None).is_none());
    assert!(hero.request_value("healing", None).is_none());
}

/// Gear, providers and effects share one priority namespace.
#[test]
fn test_mixed_candidates() {
    let clock = ManualClock::new(500);
    let mut hero = StatEntity::new("hero", StatMap::from([("strength", 10.0)]))
        .with_clock(Arc::new(clock.clone()));

    hero.resolver_mut().register_gear(weapon("axe", 20, true));
    hero.resolver_mut()
        .register_provider(CountingProvider::new("fallback", 1, Some(1.0)));
    hero.add_effect(
        Arc::new(PurposeEffect::new(
            Arc::new(EffectFactory::additive("fury", "Fury", "strength", 5.0, 0)),
            ["damage"],
            |_, _| Some(999.0),
        )),
        None,
    )
    .unwrap();

    // Gear wins on priority and sees strength with fury applied.
    let result = hero
        .request_value("damage", Some(RequestParameters::new().with("bonus", 1.5)))
        .unwrap();
    assert_eq!(result.value, 31.5);
    assert_eq!(result.provider_kind, ProviderKind::Gear);
    assert_eq!(result.timestamp, 500);
    assert_eq!(result.context.entity_id, "hero");
    assert_eq!(result.context.active_effects.len(), 1);
    assert_eq!(result.context.base_stats.get("strength"), 10.0);

    // Without the gear, the provider (priority 1) outranks the effect (0).
    assert!(hero.resolver_mut().unregister_gear("axe"));
    let result = hero.request_value("damage", None).unwrap();
    assert_eq!(result.provider_id, "fallback");

    assert!(hero.resolver_mut().unregister_provider("fallback"));
    let result = hero.request_value("damage", None).unwrap();
    assert_eq!(result.provider_id, "fury");
    assert_eq!(result.provider_kind, ProviderKind::Effect);
}

/// Unequipped gear and inactive providers are skipped.
#[test]
fn test_inactive_candidates_skipped() {
    let mut hero = StatEntity::new("hero", StatMap::from([("strength", 1.0)]));
    hero.resolver_mut().register_gear(weapon("stowed", 50, false));

    let mut dormant = CountingProvider::new("dormant", 40, Some(7.0));
    Arc::get_mut(&mut dormant).unwrap().active = false;
    hero.resolver_mut().register_provider(dormant.clone());
    hero.resolver_mut()
        .register_provider(CountingProvider::new("awake", 0, Some(3.0)));

    let result = hero.request_value("damage", None).unwrap();
    assert_eq!(result.provider_id, "awake");
    assert_eq!(dormant.calls(), 0);
}

/// Each request gets its own id.
#[test]
fn test_request_ids_are_unique() {
    let mut hero = StatEntity::new("hero", StatMap::new());
    hero.resolver_mut()
        .register_provider(CountingProvider::new("p", 0, Some(1.0)));

    let a = hero.request_value("damage", None).unwrap();
    let b = hero.request_value("damage", None).unwrap();
    assert_ne!(a.context.request_id, b.context.request_id);
}
