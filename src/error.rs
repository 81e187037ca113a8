//! Error types for effect construction and attachment.
//!
//! Expected data gaps are not errors: an absent stat reads as `0.0` and an
//! unanswered value request is `None`. `StatError` covers programmer errors
//! (incomplete builders, bad operators, bad configuration) and rejected
//! stacking.

use crate::stat_type::StatType;
use thiserror::Error;

/// Errors produced by the engine.
///
/// # Examples
///
/// ```rust
/// use statline::StatError;
///
/// let err = StatError::MissingStrategy {
///     component: "impact",
///     effect_id: "haste".to_string(),
/// };
/// assert_eq!(err.to_string(), "Missing impact strategy for effect haste");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatError {
    /// An `EffectBuilder` was finished without a required strategy.
    #[error("Missing {component} strategy for effect {effect_id}")]
    MissingStrategy {
        component: &'static str,
        effect_id: String,
    },

    /// Both effects declare the stat non-stackable.
    #[error("Effect {incoming} cannot stack with {existing} on stat {stat}")]
    StackingConflict {
        incoming: String,
        existing: String,
        stat: StatType,
    },

    /// Attaching the effect would exceed a declared maximum stack size.
    #[error("Effect {incoming} exceeds stack limit of {limit} on stat {stat}")]
    StackLimitExceeded {
        incoming: String,
        stat: StatType,
        limit: usize,
    },

    /// A target selector failed; callers fall back to their default list.
    #[error("Target selection failed: {0}")]
    TargetSelection(String),

    /// A comparison operator string could not be parsed.
    #[error("Unknown comparison operator: {0}")]
    UnknownComparison(String),

    /// Engine configuration could not be parsed or is inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
