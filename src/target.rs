//! Target strategies.
//!
//! A target policy decides which stats an effect touches in a given
//! context.

use crate::bound::{calculate_bounds, BoundConfig};
use crate::context::EffectContext;
use crate::error::StatError;
use crate::stat_type::StatType;

/// Selects the stats an effect touches.
pub trait Target: Send + Sync {
    fn targets(&self, ctx: &EffectContext<'_>) -> Vec<StatType>;

    /// Stats this target may select, known without a context.
    ///
    /// Used as the default `stat_types` of a composed effect.
    fn declared_stats(&self) -> Vec<StatType>;
}

/// Always targets one stat.
#[derive(Debug, Clone)]
pub struct SingleStatTarget {
    stat: StatType,
}

impl SingleStatTarget {
    pub fn new(stat: impl Into<StatType>) -> Self {
        Self { stat: stat.into() }
    }
}

impl Target for SingleStatTarget {
    fn targets(&self, _ctx: &EffectContext<'_>) -> Vec<StatType> {
        vec![self.stat.clone()]
    }

    fn declared_stats(&self) -> Vec<StatType> {
        vec![self.stat.clone()]
    }
}

/// Always targets a fixed list of stats, in order.
#[derive(Debug, Clone)]
pub struct MultiStatTarget {
    stats: Vec<StatType>,
}

impl MultiStatTarget {
    pub fn new<I, S>(stats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatType>,
    {
        Self {
            stats: stats.into_iter().map(Into::into).collect(),
        }
    }
}

impl Target for MultiStatTarget {
    fn targets(&self, _ctx: &EffectContext<'_>) -> Vec<StatType> {
        self.stats.clone()
    }

    fn declared_stats(&self) -> Vec<StatType> {
        self.stats.clone()
    }
}

type TargetSelector = dyn Fn(&EffectContext<'_>, &StatType) -> Result<bool, StatError> + Send + Sync;

/// Keeps the candidates a selector accepts.
///
/// If the selector fails for any candidate, the whole selection falls back
/// to the configured fallback list.
///
/// # Examples
///
/// ```rust
/// use statline::target::{ConditionalTarget, Target};
/// use statline::{EffectContext, StatError, StatMap};
///
/// // Buff whichever resistances are currently below 20.
/// let weak_spots = ConditionalTarget::new(
///     ["fire_resist", "cold_resist"],
///     |ctx, stat| Ok(ctx.stat(stat.as_str()) < 20.0),
///     ["fire_resist"],
/// );
///
/// let base = StatMap::from([("fire_resist", 50.0), ("cold_resist", 5.0)]);
/// let ctx = EffectContext::new("hero", &[], &base, 0);
/// let targets = weak_spots.targets(&ctx);
/// assert_eq!(targets.len(), 1);
/// assert_eq!(targets[0].as_str(), "cold_resist");
/// ```
pub struct ConditionalTarget {
    candidates: Vec<StatType>,
    selector: Box<TargetSelector>,
    fallback: Vec<StatType>,
}

impl ConditionalTarget {
    pub fn new<C, S, F, B, T>(candidates: C, selector: F, fallback: B) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<StatType>,
        F: Fn(&EffectContext<'_>, &StatType) -> Result<bool, StatError> + Send + Sync + 'static,
        B: IntoIterator<Item = T>,
        T: Into<StatType>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            selector: Box::new(selector),
            fallback: fallback.into_iter().map(Into::into).collect(),
        }
    }

    fn select(&self, ctx: &EffectContext<'_>) -> Result<Vec<StatType>, StatError> {
        let mut selected = Vec::new();
        for stat in &self.candidates {
            if (self.selector)(ctx, stat)? {
                selected.push(stat.clone());
            }
        }
        Ok(selected)
    }
}

impl Target for ConditionalTarget {
    fn targets(&self, ctx: &EffectContext<'_>) -> Vec<StatType> {
        match self.select(ctx) {
            Ok(selected) => selected,
            Err(err) => {
                tracing::warn!(entity = %ctx.entity_id, error = %err, "target selection failed, using fallback");
                self.fallback.clone()
            }
        }
    }

    fn declared_stats(&self) -> Vec<StatType> {
        let mut stats = self.candidates.clone();
        for stat in &self.fallback {
            if !stats.contains(stat) {
                stats.push(stat.clone());
            }
        }
        stats
    }
}

/// Picks targets from a stat's bound ratio.
pub struct BoundRatioTarget {
    bound_stat: StatType,
    bounds: BoundConfig,
    selector: Box<dyn Fn(f64) -> Vec<StatType> + Send + Sync>,
    possible: Vec<StatType>,
}

impl BoundRatioTarget {
    /// `possible` lists every stat the selector may return.
    pub fn new<F, I, S>(bound_stat: impl Into<StatType>, bounds: BoundConfig, selector: F, possible: I) -> Self
    where
        F: Fn(f64) -> Vec<StatType> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<StatType>,
    {
        Self {
            bound_stat: bound_stat.into(),
            bounds,
            selector: Box::new(selector),
            possible: possible.into_iter().map(Into::into).collect(),
        }
    }
}

impl Target for BoundRatioTarget {
    fn targets(&self, ctx: &EffectContext<'_>) -> Vec<StatType> {
        let ratio =
            calculate_bounds(self.bound_stat.clone(), &self.bounds, &ctx.current_stats).ratio();
        (self.selector)(ratio)
    }

    fn declared_stats(&self) -> Vec<StatType> {
        self.possible.clone()
    }
}
