//! Simulation-wide configuration.
//!
//! [`SimulationConfig`] is read once when a [`Simulation`](crate::world::Simulation)
//! is built and never changes afterwards. Every field has a default, so a
//! JSON document only needs to name what it overrides:
//!
//! ```
//! use timeloop_engine::config::SimulationConfig;
//!
//! let config = SimulationConfig::from_json(r#"{ "total_ticks": 100 }"#).unwrap();
//! assert_eq!(config.total_ticks, 100);
//! assert_eq!(config.field_width, 1500.0);
//! ```

use serde::{Deserialize, Serialize};
use timeloop_core::spacetime::{MainEpoch, SelfEpoch, Vec2};

use crate::{SimError, SimResult};

// ---------------------------------------------------------------------------
// SimulationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Length of the main timeline loop. Must be positive.
    pub total_ticks: u64,
    /// Field width; objects bounce at `x = ±field_width / 2`.
    pub field_width: f64,
    /// Field height; objects bounce at `y = ±field_height / 2`.
    pub field_height: f64,
    /// Depth per main epoch used by [`z_from_epoch`](Self::z_from_epoch).
    pub z_per_tick: f64,
    /// First self-epoch that gets a trail marker.
    pub trail_marker_start: SelfEpoch,
    /// Self-epochs between trail markers. Must be positive.
    pub trail_marker_every: u64,
    /// Stop advancing after this many full loops of the main timeline.
    pub loop_limit: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_ticks: 2000,
            field_width: 1500.0,
            field_height: 1000.0,
            z_per_tick: 1.0,
            trail_marker_start: 0,
            trail_marker_every: 3,
            loop_limit: None,
        }
    }
}

impl SimulationConfig {
    /// Parse a JSON document and validate the result.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field's constraints.
    pub fn validate(&self) -> SimResult<()> {
        if self.total_ticks == 0 {
            return Err(SimError::InvalidConfig(
                "total_ticks must be positive".to_owned(),
            ));
        }
        for (name, value) in [
            ("field_width", self.field_width),
            ("field_height", self.field_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.z_per_tick.is_finite() {
            return Err(SimError::InvalidConfig(format!(
                "z_per_tick must be finite, got {}",
                self.z_per_tick
            )));
        }
        if self.trail_marker_every == 0 {
            return Err(SimError::InvalidConfig(
                "trail_marker_every must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Half the field size on each axis: the reflection thresholds.
    pub fn field_half_extents(&self) -> Vec2 {
        Vec2::new(self.field_width / 2.0, self.field_height / 2.0)
    }

    /// Depth at which a renderer stacks main epoch `main_epoch`.
    pub fn z_from_epoch(&self, main_epoch: MainEpoch) -> f64 {
        main_epoch as f64 * self.z_per_tick
    }

    /// Elapsed ticks after which the simulation halts, if limited.
    pub fn tick_limit(&self) -> Option<u64> {
        self.loop_limit
            .map(|loops| loops.saturating_mul(self.total_ticks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_game() {
        let config = SimulationConfig::default();
        assert_eq!(config.total_ticks, 2000);
        assert_eq!(config.field_half_extents(), Vec2::new(750.0, 500.0));
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_limit(), None);
    }

    #[test]
    fn from_json_fills_defaults() {
        let config =
            SimulationConfig::from_json(r#"{ "field_width": 200.0, "loop_limit": 3 }"#).unwrap();
        assert_eq!(config.field_width, 200.0);
        assert_eq!(config.total_ticks, 2000);
        assert_eq!(config.tick_limit(), Some(6000));
    }

    #[test]
    fn from_json_rejects_invalid_values() {
        let err = SimulationConfig::from_json(r#"{ "total_ticks": 0 }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
        let err = SimulationConfig::from_json(r#"{ "field_height": -1.0 }"#).unwrap_err();
        assert!(err.to_string().contains("field_height"));
        let err = SimulationConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn z_scales_with_main_epoch() {
        let config = SimulationConfig {
            z_per_tick: 0.5,
            ..Default::default()
        };
        assert_eq!(config.z_from_epoch(10), 5.0);
        assert_eq!(config.z_from_epoch(0), 0.0);
    }
}
