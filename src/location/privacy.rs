//! Privacy-focused location obfuscation.
//!
//! This module turns a raw coordinate into the coordinate that is actually
//! disclosed, according to the user's [`PrivacySettings`] and the current
//! [`EmergencyState`]. The policy, evaluated in order:
//!
//! 1. Sharing disabled: the configured fallback coordinate is returned.
//! 2. Emergency active and override allowed: the raw coordinate is returned.
//! 3. Otherwise by precision tier:
//!
//! | Tier          | Transform                                      | Deterministic |
//! |---------------|------------------------------------------------|---------------|
//! | `Exact`       | none                                           | yes           |
//! | `Approximate` | random offset within a radius (100 m default)  | no            |
//! | `AreaOnly`    | snap to a grid (1000 m default)                | yes           |
//!
//! Unrecognized tiers never reach this module: they are normalized to
//! `Approximate` when settings are parsed.

use std::f64::consts::PI;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::geo::{destination_point, METERS_PER_DEGREE};
use super::types::Coordinate;
use crate::settings::{EmergencyState, PrecisionTier, PrivacySettings};

/// Default radius of the `Approximate` noise disc, in meters.
pub const DEFAULT_APPROXIMATE_RADIUS_METERS: f64 = 100.0;

/// Default cell size of the `AreaOnly` grid, in meters.
pub const DEFAULT_AREA_GRID_METERS: f64 = 1_000.0;

/// Coordinate disclosed when location sharing is turned off (Tokyo Station).
pub const DEFAULT_UNDISCLOSED_LOCATION: Coordinate = Coordinate::new(35.6762, 139.6503);

/// Source of uniform randomness for `Approximate` noise.
///
/// Abstracted so tests can inject a seeded generator. Implementations must be
/// callable concurrently through a shared reference.
pub trait NoiseSource: Send + Sync {
    /// Returns a uniformly distributed value in `[0.0, 1.0)`.
    fn next_unit(&self) -> f64;
}

/// Noise drawn from the thread-local OS-seeded generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadNoise;

impl NoiseSource for ThreadNoise {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Deterministic noise from a fixed seed.
///
/// The same seed always yields the same sequence of obfuscated coordinates.
#[derive(Debug)]
pub struct SeededNoise {
    rng: Mutex<StdRng>,
}

impl SeededNoise {
    /// Creates a generator from a 64-bit seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn next_unit(&self) -> f64 {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen::<f64>()
    }
}

/// Applies the disclosure policy to raw coordinates.
///
/// Holds only configuration and a noise source, so a single instance can be
/// shared between tasks behind an `Arc`.
///
/// # Examples
///
/// ```
/// use whereabouts_core::location::{Coordinate, LocationObfuscator};
/// use whereabouts_core::settings::{EmergencyState, PrecisionTier, PrivacySettings};
///
/// let obfuscator = LocationObfuscator::default();
/// let settings = PrivacySettings::default().with_precision(PrecisionTier::Exact);
/// let raw = Coordinate::new(35.6812, 139.7671);
///
/// let disclosed = obfuscator.process_location(raw, &settings, &EmergencyState::default());
/// assert_eq!(disclosed, raw);
/// ```
pub struct LocationObfuscator {
    undisclosed: Coordinate,
    approximate_radius_m: f64,
    area_grid_m: f64,
    noise: Box<dyn NoiseSource>,
}

impl std::fmt::Debug for LocationObfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationObfuscator")
            .field("undisclosed", &self.undisclosed)
            .field("approximate_radius_m", &self.approximate_radius_m)
            .field("area_grid_m", &self.area_grid_m)
            .finish_non_exhaustive()
    }
}

impl Default for LocationObfuscator {
    fn default() -> Self {
        Self::new(
            DEFAULT_UNDISCLOSED_LOCATION,
            DEFAULT_APPROXIMATE_RADIUS_METERS,
            DEFAULT_AREA_GRID_METERS,
            Box::new(ThreadNoise),
        )
    }
}

impl LocationObfuscator {
    /// Creates an obfuscator with explicit policy parameters.
    ///
    /// # Arguments
    ///
    /// * `undisclosed` - Coordinate returned when sharing is disabled
    /// * `approximate_radius_m` - Maximum noise offset for `Approximate`
    /// * `area_grid_m` - Grid cell size for `AreaOnly`
    /// * `noise` - Randomness for `Approximate`
    #[must_use]
    pub fn new(
        undisclosed: Coordinate,
        approximate_radius_m: f64,
        area_grid_m: f64,
        noise: Box<dyn NoiseSource>,
    ) -> Self {
        Self {
            undisclosed,
            approximate_radius_m,
            area_grid_m,
            noise,
        }
    }

    /// Replaces the noise source, keeping the other parameters.
    #[must_use]
    pub fn with_noise(self, noise: Box<dyn NoiseSource>) -> Self {
        Self { noise, ..self }
    }

    /// Coordinate disclosed while sharing is off.
    #[must_use]
    pub const fn undisclosed(&self) -> Coordinate {
        self.undisclosed
    }

    /// Computes the disclosed coordinate for `raw`.
    ///
    /// Reads `settings` and `emergency` as given; callers pass the latest
    /// values on every call, so a settings change applies to the very next
    /// coordinate.
    #[must_use]
    pub fn process_location(
        &self,
        raw: Coordinate,
        settings: &PrivacySettings,
        emergency: &EmergencyState,
    ) -> Coordinate {
        if !settings.location_sharing {
            return self.undisclosed;
        }

        if emergency.active && settings.emergency_override {
            return raw;
        }

        match settings.precision {
            PrecisionTier::Exact => raw,
            PrecisionTier::Approximate => {
                add_noise(raw, self.approximate_radius_m, self.noise.as_ref())
            }
            PrecisionTier::AreaOnly => snap_to_grid(raw, self.area_grid_m),
        }
    }
}

/// Displaces `raw` by a random offset of at most `radius_m` meters.
///
/// Draws a bearing uniformly in `[0, 2π)` and a distance uniformly in
/// `[0, radius_m)`, then moves along the great circle. Away from the poles
/// this is the familiar `Δlat = d·cos(a)/111000`,
/// `Δlon = d·sin(a)/(111000·cos(lat))` offset; near them the result still
/// lands within `radius_m` and stays a valid coordinate.
#[must_use]
pub fn add_noise(raw: Coordinate, radius_m: f64, noise: &dyn NoiseSource) -> Coordinate {
    let bearing = noise.next_unit() * 2.0 * PI;
    let distance = noise.next_unit() * radius_m;

    destination_point(raw, bearing, distance)
}

/// Rounds both axes of `raw` to the nearest multiple of the grid step.
///
/// The step is `grid_m / 111000` degrees on both axes. Snapping an already
/// snapped coordinate returns it unchanged.
///
/// # Examples
///
/// ```
/// use whereabouts_core::location::{privacy::snap_to_grid, Coordinate};
///
/// let snapped = snap_to_grid(Coordinate::new(35.6762, 139.6503), 1000.0);
/// assert_eq!(snap_to_grid(snapped, 1000.0), snapped);
/// ```
#[must_use]
pub fn snap_to_grid(raw: Coordinate, grid_m: f64) -> Coordinate {
    let step = grid_m / METERS_PER_DEGREE;
    Coordinate::new(
        snap_axis(raw.latitude, step),
        snap_axis(raw.longitude, step),
    )
}

fn snap_axis(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}
