//! Scene configuration resource.
//!
//! Manages engine settings loaded from an INI configuration file. Provides
//! defaults for safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [animation]
//! sampling_rate = 60
//! time_scale = 1.0
//!
//! [picking]
//! tolerance = 0.000001
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::error::{Result, SceneError};

/// Default safe values for startup
const DEFAULT_SAMPLING_RATE: f32 = 60.0;
const DEFAULT_TIME_SCALE: f32 = 1.0;
const DEFAULT_RAY_TOLERANCE: f32 = 1e-6;
const DEFAULT_CONFIG_PATH: &str = "./scene.ini";

/// Scene configuration resource.
///
/// `sampling_rate` caps how many new samples per second any animator may
/// draw, whatever its own frequency.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Maximum animator sample rate, in samples per second.
    pub sampling_rate: f32,
    /// Initial `WorldTime::time_scale`.
    pub time_scale: f32,
    /// Determinant / parallelism tolerance used when picking.
    pub ray_tolerance: f32,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLING_RATE,
            time_scale: DEFAULT_TIME_SCALE,
            ray_tolerance: DEFAULT_RAY_TOLERANCE,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values. Out of range
    /// values are rejected and leave the configuration untouched.
    pub fn load_from_file(&mut self) -> Result<()> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| SceneError::Config(format!("Failed to load config file: {}", e)))?;

        let mut loaded = self.clone();

        // [animation] section
        if let Some(rate) = config.getfloat("animation", "sampling_rate").ok().flatten() {
            loaded.sampling_rate = rate as f32;
        }
        if let Some(scale) = config.getfloat("animation", "time_scale").ok().flatten() {
            loaded.time_scale = scale as f32;
        }

        // [picking] section
        if let Some(tolerance) = config.getfloat("picking", "tolerance").ok().flatten() {
            loaded.ray_tolerance = tolerance as f32;
        }

        loaded.validate()?;
        *self = loaded;

        info!(
            "Loaded config: sampling_rate={}, time_scale={}, tolerance={}",
            self.sampling_rate, self.time_scale, self.ray_tolerance
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<()> {
        let mut config = Ini::new();

        // [animation] section
        config.set("animation", "sampling_rate", Some(self.sampling_rate.to_string()));
        config.set("animation", "time_scale", Some(self.time_scale.to_string()));

        // [picking] section
        config.set("picking", "tolerance", Some(self.ray_tolerance.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| SceneError::Config(format!("Failed to save config file: {}", e)))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(SceneError::Config(format!(
                "sampling_rate must be positive, got {}",
                self.sampling_rate
            )));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(SceneError::Config(format!(
                "time_scale must be non-negative, got {}",
                self.time_scale
            )));
        }
        if !(self.ray_tolerance.is_finite() && self.ray_tolerance >= 0.0) {
            return Err(SceneError::Config(format!(
                "tolerance must be non-negative, got {}",
                self.ray_tolerance
            )));
        }
        Ok(())
    }
}
