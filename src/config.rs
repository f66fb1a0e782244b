//! Engine configuration.
//!
//! Loaded from a TOML file; every field has a default so a partial (or
//! missing) file yields a working configuration.
//!
//! ```toml
//! [privacy]
//! approximate_radius_m = 150.0
//!
//! [emergency]
//! ttl_secs = 900
//!
//! [tracking]
//! snapshot_interval = 20
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::privacy::{
    DEFAULT_APPROXIMATE_RADIUS_METERS, DEFAULT_AREA_GRID_METERS, DEFAULT_UNDISCLOSED_LOCATION,
};
use crate::location::Coordinate;
use crate::settings::DEFAULT_EMERGENCY_TTL;
use crate::tracking::{
    DEFAULT_SIMPLIFY_TOLERANCE_METERS, DEFAULT_SMOOTHING_WINDOW, DEFAULT_SNAPSHOT_INTERVAL,
};

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Obfuscation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Latitude disclosed while sharing is off.
    #[serde(default = "default_undisclosed_latitude")]
    pub undisclosed_latitude: f64,

    /// Longitude disclosed while sharing is off.
    #[serde(default = "default_undisclosed_longitude")]
    pub undisclosed_longitude: f64,

    /// Noise radius for the `Approximate` tier, in meters.
    #[serde(default = "default_approximate_radius")]
    pub approximate_radius_m: f64,

    /// Grid cell size for the `AreaOnly` tier, in meters.
    #[serde(default = "default_area_grid")]
    pub area_grid_m: f64,
}

const fn default_undisclosed_latitude() -> f64 {
    DEFAULT_UNDISCLOSED_LOCATION.latitude
}

const fn default_undisclosed_longitude() -> f64 {
    DEFAULT_UNDISCLOSED_LOCATION.longitude
}

const fn default_approximate_radius() -> f64 {
    DEFAULT_APPROXIMATE_RADIUS_METERS
}

const fn default_area_grid() -> f64 {
    DEFAULT_AREA_GRID_METERS
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            undisclosed_latitude: default_undisclosed_latitude(),
            undisclosed_longitude: default_undisclosed_longitude(),
            approximate_radius_m: default_approximate_radius(),
            area_grid_m: default_area_grid(),
        }
    }
}

impl PrivacyConfig {
    /// Coordinate disclosed while sharing is off.
    #[must_use]
    pub const fn undisclosed(&self) -> Coordinate {
        Coordinate::new(self.undisclosed_latitude, self.undisclosed_longitude)
    }
}

/// Emergency override parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Seconds before an emergency deactivates on its own.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_ttl_secs() -> u64 {
    DEFAULT_EMERGENCY_TTL.as_secs()
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl EmergencyConfig {
    /// TTL as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Tracking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Points between background snapshots (0 disables them).
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: usize,

    /// Default Douglas-Peucker tolerance, in meters.
    #[serde(default = "default_simplify_tolerance")]
    pub simplify_tolerance_m: f64,

    /// Default moving-average window.
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

const fn default_snapshot_interval() -> usize {
    DEFAULT_SNAPSHOT_INTERVAL
}

const fn default_simplify_tolerance() -> f64 {
    DEFAULT_SIMPLIFY_TOLERANCE_METERS
}

const fn default_smoothing_window() -> usize {
    DEFAULT_SMOOTHING_WINDOW
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: default_snapshot_interval(),
            simplify_tolerance_m: default_simplify_tolerance(),
            smoothing_window: default_smoothing_window(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Obfuscation parameters.
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Emergency override parameters.
    #[serde(default)]
    pub emergency: EmergencyConfig,

    /// Tracking parameters.
    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl EngineConfig {
    /// Loads configuration from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails [`EngineConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if !self.privacy.undisclosed().is_valid() {
            return Err(ConfigError::Invalid(format!(
                "undisclosed location ({}, {}) is not a valid coordinate",
                self.privacy.undisclosed_latitude, self.privacy.undisclosed_longitude
            )));
        }
        if !(self.privacy.approximate_radius_m.is_finite() && self.privacy.approximate_radius_m >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "approximate_radius_m must be a non-negative number, got {}",
                self.privacy.approximate_radius_m
            )));
        }
        if !(self.privacy.area_grid_m.is_finite() && self.privacy.area_grid_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "area_grid_m must be > 0, got {}",
                self.privacy.area_grid_m
            )));
        }
        if self.emergency.ttl_secs == 0 {
            return Err(ConfigError::Invalid("ttl_secs must be > 0".into()));
        }
        if !(self.tracking.simplify_tolerance_m.is_finite()
            && self.tracking.simplify_tolerance_m >= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "simplify_tolerance_m must be a non-negative number, got {}",
                self.tracking.simplify_tolerance_m
            )));
        }
        Ok(())
    }
}
