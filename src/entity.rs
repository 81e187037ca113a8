//! Stat store module.
//!
//! Provides `StatEntity`, which owns an entity's base stats and attached
//! effects, runs the priority-ordered apply pass, and caches the result.
//!
//! A calculation pass:
//! 1. Seeds a working map from the base stats
//! 2. Keeps the attached effects that are active (per-effect cache)
//! 3. Sorts them by `(priority, insertion sequence)`
//! 4. Applies each one against a single shared `EffectContext`
//! 5. Caches the result under the entity's fingerprint
//!
//! Nothing here schedules time. Expiry happens when the caller drives
//! [`StatEntity::check_expired_effects`].

use crate::clock::{Clock, SystemClock};
use crate::computed::ComputedStats;
use crate::config::EngineConfig;
use crate::context::{EffectContext, RequestParameters};
use crate::effect::Effect;
use crate::error::StatError;
use crate::events::{EventSink, RemovalReason, StatEvent};
use crate::resolver::{ValueRequestContext, ValueRequestResult, ValueResolver};
use crate::stat_map::{StatMap, StatValue};
use crate::stat_type::StatType;
use std::collections::HashMap;
use std::sync::Arc;

/// When an attached effect was applied and when it runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTiming {
    pub applied_at: u64,
    pub duration_ms: Option<u64>,
    pub expires_at: Option<u64>,
}

struct AttachedEffect {
    effect: Arc<dyn Effect>,
    timing: EffectTiming,
    /// Insertion order; breaks priority ties.
    sequence: u64,
}

#[derive(Debug, Clone, Copy)]
struct CachedActivity {
    active: bool,
    checked_at: u64,
}

/// An entity's stats plus the effects modifying them.
///
/// # Examples
///
/// ```rust
/// use statline::factory::EffectFactory;
/// use statline::{StatEntity, StatMap};
/// use std::sync::Arc;
///
/// let mut hero = StatEntity::new("hero", StatMap::from([("strength", 10.0)]));
///
/// hero.add_effect(Arc::new(EffectFactory::additive("ring", "Ring of Might", "strength", 5.0, 0)), None)
///     .unwrap();
/// assert_eq!(hero.get_stat("strength"), 15.0);
///
/// assert!(hero.remove_effect("ring"));
/// assert_eq!(hero.get_stat("strength"), 10.0);
/// ```
pub struct StatEntity {
    id: String,
    base_stats: StatMap,
    effects: Vec<AttachedEffect>,
    next_sequence: u64,

    /// Computed stat maps keyed by fingerprint.
    stats_cache: HashMap<String, ComputedStats>,

    /// Per-effect `is_active` results keyed by effect id.
    ///
    /// Activity is judged against the base stats before any effect
    /// applies, so entries survive changes to the effect set until the
    /// TTL lapses or a base stat is written.
    activity_cache: HashMap<String, CachedActivity>,

    last_computation: Option<ComputedStats>,
    recompute_count: u64,

    resolver: ValueResolver,
    next_request: u64,

    config: EngineConfig,
    clock: Arc<dyn Clock>,
    events: Option<Arc<dyn EventSink>>,
}

impl StatEntity {
    /// Create an entity with the system clock, default config and no sink.
    pub fn new(id: impl Into<String>, base_stats: StatMap) -> Self {
        Self {
            id: id.into(),
            base_stats,
            effects: Vec::new(),
            next_sequence: 0,
            stats_cache: HashMap::new(),
            activity_cache: HashMap::new(),
            last_computation: None,
            recompute_count: 0,
            resolver: ValueResolver::new(),
            next_request: 0,
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    /// Use `clock` for timestamps, expiry and cache ages.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send `StatChanged` and effect lifecycle events to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Replace the default engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Entity id, used in events and cache fingerprints.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Engine configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Stored stats before any effect applies.
    pub fn base_stats(&self) -> &StatMap {
        &self.base_stats
    }

    /// Set a base stat. Emits `StatChanged` and invalidates the caches.
    pub fn set_base_stat(&mut self, stat: impl Into<StatType>, value: StatValue) {
        let stat = stat.into();
        let old_value = self.base_stats.set(stat.clone(), value).unwrap_or(0.0);
        self.invalidate_caches();
        tracing::debug!(entity = %self.id, stat = %stat, old_value, new_value = value, "base stat set");
        self.emit(StatEvent::StatChanged {
            entity_id: self.id.clone(),
            stat_type: stat,
            old_value,
            new_value: value,
            timestamp: self.clock.now_ms(),
        });
    }

    /// Alias of [`StatEntity::set_base_stat`].
    pub fn set_stat(&mut self, stat: impl Into<StatType>, value: StatValue) {
        self.set_base_stat(stat, value);
    }

    /// Attach an effect, optionally expiring `duration_ms` from now.
    ///
    /// Re-attaching an id replaces the previous instance, emitting
    /// `EffectRemoved` with [`RemovalReason::Replaced`] before the new
    /// `EffectAdded`. When stackability is enforced (the default) the
    /// effect is rejected if it would conflict with an attached effect on
    /// a shared stat, or exceed its own declared maximum stack size.
    pub fn add_effect(
        &mut self,
        effect: Arc<dyn Effect>,
        duration_ms: Option<u64>,
    ) -> Result<(), StatError> {
        if self.config.enforce_stackability {
            self.check_stacking(effect.as_ref())?;
        }

        let now = self.clock.now_ms();
        let timing = EffectTiming {
            applied_at: now,
            duration_ms,
            expires_at: duration_ms.map(|d| now.saturating_add(d)),
        };

        let replaced = match self.effects.iter().position(|a| a.effect.id() == effect.id()) {
            Some(pos) => {
                self.effects.remove(pos);
                true
            }
            None => false,
        };
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.effects.push(AttachedEffect {
            effect: Arc::clone(&effect),
            timing,
            sequence,
        });
        self.forget_effect(effect.id());

        if replaced {
            tracing::debug!(entity = %self.id, effect = %effect.id(), "effect replaced");
            self.emit(StatEvent::EffectRemoved {
                entity_id: self.id.clone(),
                effect_id: effect.id().to_string(),
                reason: RemovalReason::Replaced,
                timestamp: now,
            });
        }

        tracing::debug!(
            entity = %self.id,
            effect = %effect.id(),
            priority = effect.priority(),
            ?duration_ms,
            "effect attached"
        );
        self.emit(StatEvent::EffectAdded {
            entity_id: self.id.clone(),
            effect_id: effect.id().to_string(),
            effect_name: effect.name().to_string(),
            duration_ms,
            expires_at: timing.expires_at,
            timestamp: now,
        });
        Ok(())
    }

    /// Detach an effect. Returns whether it was attached.
    pub fn remove_effect(&mut self, effect_id: &str) -> bool {
        let Some(pos) = self.effects.iter().position(|a| a.effect.id() == effect_id) else {
            return false;
        };
        self.effects.remove(pos);
        self.forget_effect(effect_id);
        tracing::debug!(entity = %self.id, effect = %effect_id, "effect removed");
        self.emit(StatEvent::EffectRemoved {
            entity_id: self.id.clone(),
            effect_id: effect_id.to_string(),
            reason: RemovalReason::Manual,
            timestamp: self.clock.now_ms(),
        });
        true
    }

    /// Detach every effect whose expiry is at or before `now`.
    ///
    /// Returns the removed ids in attachment order.
    pub fn check_expired_effects(&mut self, now: u64) -> Vec<String> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.effects)
            .into_iter()
            .partition(|a| a.timing.expires_at.is_some_and(|at| at <= now));
        self.effects = kept;

        let removed: Vec<String> = expired
            .iter()
            .map(|a| a.effect.id().to_string())
            .collect();
        if removed.is_empty() {
            return removed;
        }

        for effect_id in &removed {
            self.forget_effect(effect_id);
        }
        tracing::debug!(entity = %self.id, count = removed.len(), now, "expired effects removed");
        for effect_id in &removed {
            self.emit(StatEvent::EffectRemoved {
                entity_id: self.id.clone(),
                effect_id: effect_id.clone(),
                reason: RemovalReason::Expired,
                timestamp: now,
            });
        }
        removed
    }

    /// Detach everything, emitting `EffectRemoved` for each effect.
    pub fn clear_effects(&mut self) {
        let ids: Vec<String> = self.effects.iter().map(|a| a.effect.id().to_string()).collect();
        for id in ids {
            self.remove_effect(&id);
        }
    }

    /// Attached effects in attachment order.
    pub fn get_effects(&self) -> Vec<Arc<dyn Effect>> {
        self.effects.iter().map(|a| Arc::clone(&a.effect)).collect()
    }

    /// Whether an effect with this id is attached.
    pub fn has_effect(&self, effect_id: &str) -> bool {
        self.effects.iter().any(|a| a.effect.id() == effect_id)
    }

    /// Timing recorded when the effect was attached.
    pub fn effect_timing(&self, effect_id: &str) -> Option<EffectTiming> {
        self.effects
            .iter()
            .find(|a| a.effect.id() == effect_id)
            .map(|a| a.timing)
    }

    /// Current stats: base stats with every active effect applied.
    ///
    /// Served from cache while the fingerprint matches and the cached pass
    /// is younger than `cache_ttl_ms`.
    pub fn get_current_stats(&mut self) -> StatMap {
        let now = self.clock.now_ms();
        let fingerprint = self.fingerprint();

        if let Some(cached) = self.stats_cache.get(&fingerprint) {
            if cached.is_fresh(now, self.config.cache_ttl_ms) {
                tracing::trace!(entity = %self.id, "stat cache hit");
                return cached.stats.clone();
            }
        }

        let computed = self.compute(fingerprint.clone(), now);
        self.stats_cache.insert(fingerprint, computed.clone());
        let stats = computed.stats.clone();
        self.last_computation = Some(computed);
        stats
    }

    /// Current value of one stat, `0.0` if absent.
    pub fn get_stat(&mut self, stat: &str) -> StatValue {
        self.get_current_stats().get(stat)
    }

    /// The most recent full pass, if any.
    pub fn last_computation(&self) -> Option<&ComputedStats> {
        self.last_computation.as_ref()
    }

    /// Number of full passes run so far.
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    /// Drop the stat cache and the per-effect activity cache.
    pub fn invalidate_caches(&mut self) {
        self.stats_cache.clear();
        self.activity_cache.clear();
    }

    /// Drop the stat cache and one effect's activity entry.
    ///
    /// Activity is judged against the base stats, so attaching or
    /// detaching one effect leaves the other entries valid until their
    /// TTL runs out.
    fn forget_effect(&mut self, effect_id: &str) {
        self.stats_cache.clear();
        self.activity_cache.remove(effect_id);
    }

    /// Gear and value providers consulted by `request_value`.
    pub fn resolver(&self) -> &ValueResolver {
        &self.resolver
    }

    /// Register gear and value providers here.
    pub fn resolver_mut(&mut self) -> &mut ValueResolver {
        &mut self.resolver
    }

    /// Ask gear, providers and attached effects for a value.
    ///
    /// `None` means no candidate answered, which is not the same as zero.
    pub fn request_value(
        &mut self,
        purpose: &str,
        parameters: Option<RequestParameters>,
    ) -> Option<ValueRequestResult> {
        let current_stats = self.get_current_stats();
        let timestamp = self.clock.now_ms();
        let request_id = format!("{}-{}", self.id, self.next_request);
        self.next_request += 1;

        let ctx = ValueRequestContext {
            entity_id: self.id.clone(),
            request_id,
            purpose: purpose.to_string(),
            timestamp,
            parameters,
            base_stats: self.base_stats.clone(),
            current_stats,
            active_effects: self.get_effects(),
        };

        let resolution = self.resolver.resolve(&ctx)?;
        Some(ValueRequestResult {
            value: resolution.value,
            provider_id: resolution.provider_id,
            provider_kind: resolution.provider_kind,
            purpose: purpose.to_string(),
            timestamp,
            context: ctx,
        })
    }

    fn fingerprint(&self) -> String {
        let ids: Vec<&str> = self.effects.iter().map(|a| a.effect.id()).collect();
        ComputedStats::fingerprint(&self.id, &ids)
    }

    fn compute(&mut self, fingerprint: String, now: u64) -> ComputedStats {
        let ttl = self.config.cache_ttl_ms;
        let stack: Vec<Arc<dyn Effect>> = self.get_effects();
        let mut ctx = EffectContext::new(&self.id, &stack, &self.base_stats, now);

        let mut active: Vec<&AttachedEffect> = Vec::with_capacity(self.effects.len());
        for attached in &self.effects {
            if effect_is_active(&mut self.activity_cache, attached, &ctx, now, ttl) {
                active.push(attached);
            }
        }
        active.sort_by_key(|a| (a.effect.priority(), a.sequence));

        for attached in &active {
            attached.effect.apply(&mut ctx);
        }

        let contributing: Vec<String> = active.iter().map(|a| a.effect.id().to_string()).collect();
        self.recompute_count += 1;
        tracing::debug!(
            entity = %self.id,
            attached = self.effects.len(),
            active = contributing.len(),
            "stats recomputed"
        );

        ComputedStats::new(fingerprint, ctx.into_stats(), contributing, now)
    }

    fn check_stacking(&self, incoming: &dyn Effect) -> Result<(), StatError> {
        for stat in incoming.stat_types() {
            let others: Vec<&dyn Effect> = self
                .effects
                .iter()
                .map(|a| a.effect.as_ref())
                .filter(|e| e.id() != incoming.id() && e.stat_types().contains(stat))
                .collect();

            for other in &others {
                if !incoming.can_stack_with(*other, stat) {
                    tracing::warn!(
                        entity = %self.id,
                        incoming = %incoming.id(),
                        existing = %other.id(),
                        stat = %stat,
                        "rejected non-stackable effect"
                    );
                    return Err(StatError::StackingConflict {
                        incoming: incoming.id().to_string(),
                        existing: other.id().to_string(),
                        stat: stat.clone(),
                    });
                }
            }

            // Only the incoming effect's own cap applies, and only effects
            // that declare a rule for the stat count towards it.
            if let Some(limit) = incoming.max_stack_size(stat) {
                let stacked = others
                    .iter()
                    .filter(|o| o.stackability_rules().iter().any(|r| &r.stat_type == stat))
                    .count();
                if stacked + 1 > limit {
                    tracing::warn!(
                        entity = %self.id,
                        incoming = %incoming.id(),
                        stat = %stat,
                        limit,
                        "rejected effect over stack limit"
                    );
                    return Err(StatError::StackLimitExceeded {
                        incoming: incoming.id().to_string(),
                        stat: stat.clone(),
                        limit,
                    });
                }
            }
        }
        Ok(())
    }

    fn emit(&self, event: StatEvent) {
        if let Some(sink) = &self.events {
            sink.emit(&event);
        }
    }
}

fn effect_is_active(
    cache: &mut HashMap<String, CachedActivity>,
    attached: &AttachedEffect,
    ctx: &EffectContext<'_>,
    now: u64,
    ttl: u64,
) -> bool {
    let id = attached.effect.id();
    if let Some(entry) = cache.get(id) {
        if now.saturating_sub(entry.checked_at) < ttl {
            return entry.active;
        }
    }
    let active = attached.effect.is_active(ctx);
    cache.insert(
        id.to_string(),
        CachedActivity {
            active,
            checked_at: now,
        },
    );
    active
}

impl std::fmt::Debug for StatEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatEntity")
            .field("id", &self.id)
            .field("base_stats", &self.base_stats)
            .field(
                "effects",
                &self.effects.iter().map(|a| a.effect.id()).collect::<Vec<_>>(),
            )
            .field("recompute_count", &self.recompute_count)
            .finish()
    }
}
