//! Bound event engine.
//!
//! Watches `(entity, stat)` pairs and turns movement of a stat within its
//! envelope into events. Each subscription remembers the ratio and state
//! seen on the previous check. A check pass runs three independent tests
//! against that same remembered snapshot:
//!
//! 1. state changed → `BoundStateChanged`
//! 2. ratio moved past the subscription's threshold (and direction gate)
//!    → `BoundRatioChanged`
//! 3. distance to min/max inside the configured window
//!    → `BoundThresholdCrossed`
//!
//! Memory is only updated once all three have run. The first check of a
//! subscription records the baseline and emits no state or ratio events.
//!
//! The engine never polls on its own; a caller-owned ticker drives
//! [`BoundEventEngine::check`].

use crate::bound::{calculate_bounds_with_defaults, BoundConfig, BoundState, BoundThresholds};
use crate::config::EngineConfig;
use crate::entity::StatEntity;
use crate::events::{BoundSide, EventSink, StatEvent};
use crate::stat_map::StatMap;
use crate::stat_type::StatType;
use std::collections::HashMap;
use std::sync::Arc;

/// One subscription's filter settings.
///
/// # Examples
///
/// ```rust
/// use statline::bound::BoundConfig;
/// use statline::bound_events::BoundEventConfig;
///
/// let config = BoundEventConfig::new("health", BoundConfig::range(0.0, 100.0))
///     .with_ratio_threshold(0.1)
///     .only_negative()
///     .with_min_distance_window(10.0);
///
/// assert!(config.only_negative);
/// assert_eq!(config.min_distance_window, Some(10.0));
/// ```
#[derive(Debug, Clone)]
pub struct BoundEventConfig {
    pub stat_type: StatType,
    pub bounds: BoundConfig,
    /// Minimum absolute ratio delta for a ratio event.
    pub ratio_change_threshold: f64,
    pub only_positive: bool,
    pub only_negative: bool,
    /// Emit a `Min` threshold event while `distance_from_min` is at most this.
    pub min_distance_window: Option<f64>,
    /// Emit a `Max` threshold event while `distance_from_max` is at most this.
    pub max_distance_window: Option<f64>,
    /// Falls back to the engine's thresholds.
    pub thresholds: Option<BoundThresholds>,
    /// Falls back to the engine's tolerance.
    pub tolerance: Option<f64>,
}

impl BoundEventConfig {
    /// Watch `stat` within `bounds`, reporting every ratio change.
    pub fn new(stat: impl Into<StatType>, bounds: BoundConfig) -> Self {
        Self {
            stat_type: stat.into(),
            bounds,
            ratio_change_threshold: 0.0,
            only_positive: false,
            only_negative: false,
            min_distance_window: None,
            max_distance_window: None,
            thresholds: None,
            tolerance: None,
        }
    }

    /// Ignore ratio changes smaller than `threshold`.
    pub fn with_ratio_threshold(mut self, threshold: f64) -> Self {
        self.ratio_change_threshold = threshold;
        self
    }

    /// Only report ratio increases.
    pub fn only_positive(mut self) -> Self {
        self.only_positive = true;
        self.only_negative = false;
        self
    }

    /// Only report ratio decreases.
    pub fn only_negative(mut self) -> Self {
        self.only_negative = true;
        self.only_positive = false;
        self
    }

    /// Report `Min` threshold events within `window` of the lower bound.
    pub fn with_min_distance_window(mut self, window: f64) -> Self {
        self.min_distance_window = Some(window);
        self
    }

    /// Report `Max` threshold events within `window` of the upper bound.
    pub fn with_max_distance_window(mut self, window: f64) -> Self {
        self.max_distance_window = Some(window);
        self
    }

    /// State thresholds for this subscription only.
    pub fn with_thresholds(mut self, thresholds: BoundThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// At-bound tolerance for this subscription only.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    fn passes_ratio_filter(&self, delta: f64) -> bool {
        if delta == 0.0 || delta.abs() < self.ratio_change_threshold {
            return false;
        }
        if self.only_positive && delta < 0.0 {
            return false;
        }
        if self.only_negative && delta > 0.0 {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    ratio: f64,
    state: BoundState,
}

#[derive(Debug)]
struct Subscription {
    config: BoundEventConfig,
    previous: Option<Snapshot>,
}

/// Per-`(entity, stat)` bound subscriptions and their memory.
///
/// # Examples
///
/// ```rust
/// use statline::bound::{BoundConfig, BoundState};
/// use statline::bound_events::{BoundEventConfig, BoundEventEngine};
/// use statline::StatMap;
///
/// let mut engine = BoundEventEngine::new();
/// engine.register("hero", BoundEventConfig::new("health", BoundConfig::range(0.0, 100.0)));
///
/// // First pass records the baseline.
/// assert!(engine.check("hero", &StatMap::from([("health", 80.0)]), 0).is_empty());
///
/// let events = engine.check("hero", &StatMap::from([("health", 20.0)]), 100);
/// assert_eq!(events[0].event_type(), "bound_state_changed");
/// assert_eq!(engine.previous_state("hero", "health"), Some(BoundState::Critical));
/// ```
#[derive(Default)]
pub struct BoundEventEngine {
    subscriptions: HashMap<String, Vec<Subscription>>,
    config: EngineConfig,
    events: Option<Arc<dyn EventSink>>,
}

impl BoundEventEngine {
    /// An engine with default config, no subscriptions and no sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`'s tolerance, thresholds and default bounds.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Also send every emitted event to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Watch `config.stat_type` on `entity_id`.
    ///
    /// Registering the same pair again replaces the filter and resets its
    /// memory.
    pub fn register(&mut self, entity_id: impl Into<String>, config: BoundEventConfig) {
        let entity_id = entity_id.into();
        tracing::debug!(entity = %entity_id, stat = %config.stat_type, "bound subscription registered");
        let subs = self.subscriptions.entry(entity_id).or_default();
        subs.retain(|s| s.config.stat_type != config.stat_type);
        subs.push(Subscription {
            config,
            previous: None,
        });
    }

    /// Stop watching a pair. Returns whether it was registered.
    pub fn unregister(&mut self, entity_id: &str, stat: &str) -> bool {
        let Some(subs) = self.subscriptions.get_mut(entity_id) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.config.stat_type.as_str() != stat);
        let removed = subs.len() != before;
        if subs.is_empty() {
            self.subscriptions.remove(entity_id);
        }
        removed
    }

    /// Whether the pair is being watched.
    pub fn is_registered(&self, entity_id: &str, stat: &str) -> bool {
        self.subscription(entity_id, stat).is_some()
    }

    /// The state remembered from the last check, if any.
    pub fn previous_state(&self, entity_id: &str, stat: &str) -> Option<BoundState> {
        self.subscription(entity_id, stat)
            .and_then(|s| s.previous)
            .map(|p| p.state)
    }

    /// The ratio remembered from the last check, if any.
    pub fn previous_ratio(&self, entity_id: &str, stat: &str) -> Option<f64> {
        self.subscription(entity_id, stat)
            .and_then(|s| s.previous)
            .map(|p| p.ratio)
    }

    fn subscription(&self, entity_id: &str, stat: &str) -> Option<&Subscription> {
        self.subscriptions
            .get(entity_id)?
            .iter()
            .find(|s| s.config.stat_type.as_str() == stat)
    }

    /// Run one check pass for every subscription of `entity_id`.
    ///
    /// Returns the events in subscription order, after sending them to the
    /// sink.
    pub fn check(&mut self, entity_id: &str, stats: &StatMap, now: u64) -> Vec<StatEvent> {
        let Some(subs) = self.subscriptions.get_mut(entity_id) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for sub in subs.iter_mut() {
            check_subscription(&self.config, entity_id, sub, stats, now, &mut events);
        }

        if !events.is_empty() {
            tracing::debug!(entity = %entity_id, count = events.len(), "bound events");
        }
        if let Some(sink) = &self.events {
            for event in &events {
                sink.emit(event);
            }
        }
        events
    }

    /// [`BoundEventEngine::check`] against an entity's current stats and
    /// clock.
    pub fn check_entity(&mut self, entity: &mut StatEntity) -> Vec<StatEvent> {
        let stats = entity.get_current_stats();
        let now = entity.now();
        self.check(entity.id(), &stats, now)
    }
}

fn check_subscription(
    defaults: &EngineConfig,
    entity_id: &str,
    sub: &mut Subscription,
    stats: &StatMap,
    now: u64,
    events: &mut Vec<StatEvent>,
) {
    let config = &sub.config;
    let thresholds = config.thresholds.unwrap_or(defaults.thresholds);
    let tolerance = config.tolerance.unwrap_or(defaults.bound_tolerance);

    let result = calculate_bounds_with_defaults(
        config.stat_type.clone(),
        &config.bounds,
        stats,
        defaults.default_min,
        defaults.default_max,
    );
    let ratio = result.ratio();
    let state = result.state(&thresholds, tolerance);

    if let Some(previous) = sub.previous {
        if previous.state != state {
            events.push(StatEvent::BoundStateChanged {
                entity_id: entity_id.to_string(),
                stat_type: config.stat_type.clone(),
                previous_state: previous.state,
                new_state: state,
                ratio,
                timestamp: now,
            });
        }

        let delta = ratio - previous.ratio;
        if config.passes_ratio_filter(delta) {
            events.push(StatEvent::BoundRatioChanged {
                entity_id: entity_id.to_string(),
                stat_type: config.stat_type.clone(),
                previous_ratio: previous.ratio,
                new_ratio: ratio,
                delta,
                timestamp: now,
            });
        }
    }

    let windows = [
        (BoundSide::Min, config.min_distance_window, result.distance_from_min()),
        (BoundSide::Max, config.max_distance_window, result.distance_from_max()),
    ];
    for (bound, window, distance) in windows {
        if let Some(window) = window {
            if distance <= window {
                events.push(StatEvent::BoundThresholdCrossed {
                    entity_id: entity_id.to_string(),
                    stat_type: config.stat_type.clone(),
                    bound,
                    distance,
                    window,
                    timestamp: now,
                });
            }
        }
    }

    sub.previous = Some(Snapshot { ratio, state });
}

impl std::fmt::Debug for BoundEventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut watched: Vec<String> = self
            .subscriptions
            .iter()
            .flat_map(|(entity, subs)| {
                subs.iter()
                    .map(move |s| format!("{}:{}", entity, s.config.stat_type))
            })
            .collect();
        watched.sort();
        f.debug_struct("BoundEventEngine")
            .field("subscriptions", &watched)
            .finish()
    }
}
