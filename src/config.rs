//! Engine configuration.
//!
//! `EngineConfig` collects the tunables that the stat store and the bound
//! event engine read. It can be built in code or parsed from TOML; any key
//! left out keeps its default.

use crate::bound::{BoundThresholds, DEFAULT_MAX, DEFAULT_MIN, DEFAULT_TOLERANCE};
use crate::error::StatError;
use serde::{Deserialize, Serialize};

/// Default lifetime of cached stat computations, in milliseconds.
pub const DEFAULT_CACHE_TTL_MS: u64 = 1000;

/// Engine tunables.
///
/// # Examples
///
/// ```rust
/// use statline::EngineConfig;
///
/// let config = EngineConfig::from_toml_str(r#"
///     cache_ttl_ms = 250
///
///     [thresholds]
///     critical = 0.1
/// "#).unwrap();
///
/// assert_eq!(config.cache_ttl_ms, 250);
/// assert_eq!(config.thresholds.critical, 0.1);
/// assert_eq!(config.thresholds.high, 0.75);
/// assert!(config.enforce_stackability);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a computed stat map (and per-effect activity) stays fresh.
    pub cache_ttl_ms: u64,
    /// Tolerance for at-min / at-max checks.
    pub bound_tolerance: f64,
    /// Default state thresholds for bound subscriptions.
    pub thresholds: BoundThresholds,
    /// Minimum used when a bound config leaves `min` unset.
    pub default_min: f64,
    /// Maximum used when a bound config leaves `max` unset.
    pub default_max: f64,
    /// Reject `add_effect` calls that violate stackability rules.
    pub enforce_stackability: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            bound_tolerance: DEFAULT_TOLERANCE,
            thresholds: BoundThresholds::default(),
            default_min: DEFAULT_MIN,
            default_max: DEFAULT_MAX,
            enforce_stackability: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, StatError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| StatError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), StatError> {
        if self.bound_tolerance < 0.0 {
            return Err(StatError::Config(format!(
                "bound_tolerance must be non-negative, got {}",
                self.bound_tolerance
            )));
        }
        let t = &self.thresholds;
        if !(t.critical <= t.low && t.low <= t.high) {
            return Err(StatError::Config(format!(
                "thresholds must satisfy critical <= low <= high, got {} / {} / {}",
                t.critical, t.low, t.high
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl_ms, 1000);
        assert_eq!(config.bound_tolerance, 0.001);
        assert_eq!(config.default_max, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_thresholds() {
        let result = EngineConfig::from_toml_str(
            r#"
            [thresholds]
            critical = 0.9
            low = 0.5
            "#,
        );
        assert!(matches!(result, Err(StatError::Config(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = EngineConfig::from_toml_str("cache_ttl_ms = \"soon\"");
        assert!(matches!(result, Err(StatError::Config(_))));
    }
}
