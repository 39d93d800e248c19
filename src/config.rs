use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::DEFAULT_UNION_CELL_SIZE;
use crate::planner::DEFAULT_STRIPE_SPACING;

/// Slowest and fastest playback multipliers accepted
pub const PLAYBACK_SPEED_RANGE: (f64, f64) = (0.1, 10.0);

/// Tunable parameters of the editor, loadable from JSON
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// World units per meter, used only for presentation
    pub units_per_meter: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Multiplier applied per zoom step (wheel notch or key press)
    pub zoom_step: f64,
    /// Sampling cell edge for the obstacle union estimate, in world units
    pub union_cell_size: f64,
    /// Distance between coverage stripes, in world units
    pub stripe_spacing: f64,
    /// Width swept by the robot, in meters
    pub coverage_width_m: f64,
    pub average_speed_mps: f64,
    /// Delay between playback ticks at speed 1.0
    pub base_tick_ms: u64,
    /// Lower bound on the delay regardless of speed
    pub min_tick_ms: u64,
    pub playback_speed: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            units_per_meter: 50.0,
            min_scale: 0.1,
            max_scale: 10.0,
            zoom_step: 1.1,
            union_cell_size: DEFAULT_UNION_CELL_SIZE,
            stripe_spacing: DEFAULT_STRIPE_SPACING,
            coverage_width_m: 0.5,
            average_speed_mps: 0.5,
            base_tick_ms: 100,
            min_tick_ms: 10,
            playback_speed: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: EditorConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("units_per_meter", self.units_per_meter),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("zoom_step", self.zoom_step),
            ("union_cell_size", self.union_cell_size),
            ("stripe_spacing", self.stripe_spacing),
            ("coverage_width_m", self.coverage_width_m),
            ("average_speed_mps", self.average_speed_mps),
            ("playback_speed", self.playback_speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::Invalid(format!(
                "min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if self.min_tick_ms == 0 {
            return Err(ConfigError::Invalid("min_tick_ms must be at least 1".into()));
        }
        Ok(())
    }

    pub fn base_tick(&self) -> Duration {
        Duration::from_millis(self.base_tick_ms)
    }

    pub fn min_tick(&self) -> Duration {
        Duration::from_millis(self.min_tick_ms)
    }
}
