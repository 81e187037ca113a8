//! Event records and transport.
//!
//! The stat store and the bound event engine report what happened as
//! `StatEvent` records sent to an injected `EventSink`. `EventBus` is a
//! plain in-process pub/sub sink: synchronous, ordered within one `emit`
//! call, no persistence.

use crate::bound::BoundState;
use crate::stat_type::StatType;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Why an effect left an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Manual,
    Expired,
    /// Superseded by a new effect with the same id.
    Replaced,
}

/// Which side of an envelope a threshold event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundSide {
    Min,
    Max,
}

/// A typed event record.
///
/// Serializes with an internal `type` tag:
///
/// ```rust
/// use statline::events::{RemovalReason, StatEvent};
///
/// let event = StatEvent::EffectRemoved {
///     entity_id: "hero".to_string(),
///     effect_id: "haste".to_string(),
///     reason: RemovalReason::Expired,
///     timestamp: 5_000,
/// };
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["type"], "effect_removed");
/// assert_eq!(json["reason"], "expired");
/// assert_eq!(event.event_type(), "effect_removed");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatEvent {
    EffectAdded {
        entity_id: String,
        effect_id: String,
        effect_name: String,
        duration_ms: Option<u64>,
        expires_at: Option<u64>,
        timestamp: u64,
    },
    EffectRemoved {
        entity_id: String,
        effect_id: String,
        reason: RemovalReason,
        timestamp: u64,
    },
    StatChanged {
        entity_id: String,
        stat_type: StatType,
        old_value: f64,
        new_value: f64,
        timestamp: u64,
    },
    BoundStateChanged {
        entity_id: String,
        stat_type: StatType,
        previous_state: BoundState,
        new_state: BoundState,
        ratio: f64,
        timestamp: u64,
    },
    BoundRatioChanged {
        entity_id: String,
        stat_type: StatType,
        previous_ratio: f64,
        new_ratio: f64,
        delta: f64,
        timestamp: u64,
    },
    BoundThresholdCrossed {
        entity_id: String,
        stat_type: StatType,
        bound: BoundSide,
        distance: f64,
        window: f64,
        timestamp: u64,
    },
}

impl StatEvent {
    /// The serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            StatEvent::EffectAdded { .. } => "effect_added",
            StatEvent::EffectRemoved { .. } => "effect_removed",
            StatEvent::StatChanged { .. } => "stat_changed",
            StatEvent::BoundStateChanged { .. } => "bound_state_changed",
            StatEvent::BoundRatioChanged { .. } => "bound_ratio_changed",
            StatEvent::BoundThresholdCrossed { .. } => "bound_threshold_crossed",
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            StatEvent::EffectAdded { entity_id, .. }
            | StatEvent::EffectRemoved { entity_id, .. }
            | StatEvent::StatChanged { entity_id, .. }
            | StatEvent::BoundStateChanged { entity_id, .. }
            | StatEvent::BoundRatioChanged { entity_id, .. }
            | StatEvent::BoundThresholdCrossed { entity_id, .. } => entity_id,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            StatEvent::EffectAdded { timestamp, .. }
            | StatEvent::EffectRemoved { timestamp, .. }
            | StatEvent::StatChanged { timestamp, .. }
            | StatEvent::BoundStateChanged { timestamp, .. }
            | StatEvent::BoundRatioChanged { timestamp, .. }
            | StatEvent::BoundThresholdCrossed { timestamp, .. } => *timestamp,
        }
    }
}

/// Receives emitted events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &StatEvent);
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&StatEvent) + Send + Sync>;

/// In-process pub/sub event sink.
///
/// Each `emit` runs against a snapshot of the subscriber list, so a handler
/// may subscribe or unsubscribe while it is being called.
///
/// # Examples
///
/// ```rust
/// use statline::events::{EventBus, EventSink, StatEvent};
/// use std::sync::{Arc, Mutex};
///
/// let bus = EventBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// bus.subscribe(move |event| sink.lock().unwrap().push(event.event_type()));
///
/// bus.emit(&StatEvent::StatChanged {
///     entity_id: "hero".to_string(),
///     stat_type: "health".into(),
///     old_value: 10.0,
///     new_value: 20.0,
///     timestamp: 0,
/// });
/// assert_eq!(*seen.lock().unwrap(), vec!["stat_changed"]);
/// ```
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every event.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StatEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(handler)));
        id
    }

    /// Register a handler for one event type (see [`StatEvent::event_type`]).
    pub fn subscribe_to<F>(&self, event_type: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(&StatEvent) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if event.event_type() == event_type {
                handler(event);
            }
        })
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &StatEvent) {
        let handlers: Vec<Handler> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
