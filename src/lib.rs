//! # statline - Composable Effect & Stat Resolution Engine
//!
//! A stat engine for game-style simulations that provides:
//! - **Composable effects** built from four orthogonal strategy policies
//! - **Priority-ordered** stat calculation with a short-lived cache
//! - **Value requests** answered by gear, providers and effects, first match wins
//! - **Bound tracking** with ratio/state derivation and change events
//!
//! ## Core Concepts
//!
//! ### Effect Pipeline
//!
//! ```text
//! base stats → [active effects, ascending priority] → current stats
//! ```
//!
//! Every effect is an `Applicability` (is it on?), a `Target` (which stats),
//! an `Impact` (how much) and an `Application` (how the map is mutated).
//! Lower priority applies first; equal priorities apply in attachment
//! order.
//!
//! ### Key Features
//!
//! - **Caching**: current stats are reused for `cache_ttl_ms` while the set
//!   of attached effects is unchanged
//! - **Polled time**: expiry and bound checks run when the caller drives
//!   them, against an injected `Clock`
//! - **Stackability**: conflicting or over-limit effects are rejected on
//!   attach
//! - **Events**: typed `StatEvent` records sent to an injected `EventSink`
//!
//! ## Example
//!
//! ```rust
//! use statline::factory::EffectFactory;
//! use statline::*;
//! use std::sync::Arc;
//!
//! let mut hero = StatEntity::new("hero", StatMap::from([("x", 0.0)]));
//!
//! hero.add_effect(Arc::new(EffectFactory::set_value("set", "Set", "x", 50.0, 1)), None)
//!     .unwrap();
//! hero.add_effect(Arc::new(EffectFactory::additive("add", "Add", "x", 10.0, 2)), None)
//!     .unwrap();
//!
//! assert_eq!(hero.get_stat("x"), 60.0);
//! ```
//!
//! ## Modules
//!
//! - [`stat_type`] - Stat key type
//! - [`stat_map`] - Stat value maps
//! - [`applicability`], [`impact`], [`target`], [`application`] - Strategy policies
//! - [`effect`] - Effect trait and composed effects
//! - [`factory`] - Effect recipes
//! - [`entity`] - Stat store with caching and expiry
//! - [`resolver`] - Value request resolution
//! - [`bound`] - Bound calculator
//! - [`bound_events`] - Bound event engine
//! - [`events`] - Event records and the in-process bus
//! - [`config`] - Engine configuration
//! - [`error`] - Error types

pub mod applicability;
pub mod application;
pub mod bound;
pub mod bound_events;
pub mod clock;
pub mod computed;
pub mod config;
pub mod context;
pub mod effect;
pub mod entity;
pub mod error;
pub mod events;
pub mod factory;
pub mod impact;
pub mod resolver;
pub mod stat_map;
pub mod stat_type;
pub mod target;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use computed::ComputedStats;
pub use config::EngineConfig;
pub use context::{EffectContext, RequestParameters};
pub use effect::{ComposedEffect, Effect, EffectBuilder, StackabilityRule};
pub use entity::{EffectTiming, StatEntity};
pub use error::StatError;
pub use stat_map::{StatMap, StatValue};
pub use stat_type::StatType;

// Re-export strategy traits
pub use applicability::Applicability;
pub use application::Application;
pub use impact::Impact;
pub use target::Target;

// Re-export resolution and bound types
pub use bound::{BoundConfig, BoundResult, BoundState, BoundThresholds};
pub use bound_events::{BoundEventConfig, BoundEventEngine};
pub use events::{EventBus, EventSink, StatEvent};
pub use factory::EffectFactory;
pub use resolver::{
    ActiveEffect, Gear, PurposeEffect, ValueProvider, ValueRequestContext, ValueRequestResult,
    ValueResolver,
};
