//! Location data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
///
/// Used for both raw positions and disclosed (obfuscated) positions; the
/// type does not record which one it holds, so callers keep the two apart
/// by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90.0 to 90.0)
    pub latitude: f64,

    /// Longitude in degrees (-180.0 to 180.0)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// use whereabouts_core::location::Coordinate;
    ///
    /// let tokyo = Coordinate::new(35.6762, 139.6503);
    /// assert_eq!(tokyo.latitude, 35.6762);
    /// ```
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns whether both components are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Where a location sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Satellite positioning fix.
    Gps,
    /// Cell/Wi-Fi network positioning.
    Network,
    /// Entered or picked by the user.
    #[default]
    Manual,
}

impl LocationSource {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gps => "gps",
            Self::Network => "network",
            Self::Manual => "manual",
        }
    }
}

/// A single position reading as delivered by a position source.
///
/// This is also the structured record that gets encrypted at rest, so its
/// serialized form is stable: `latitude`, `longitude`, `accuracy`,
/// `timestamp` (ISO-8601) and `source` (`gps`, `network` or `manual`).
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use whereabouts_core::location::{LocationSample, LocationSource};
///
/// let sample = LocationSample::new(35.0, 139.0, 8.5, Utc::now(), LocationSource::Gps);
/// let json = serde_json::to_string(&sample).unwrap();
/// assert!(json.contains("\"source\":\"gps\""));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Raw latitude in degrees
    pub latitude: f64,

    /// Raw longitude in degrees
    pub longitude: f64,

    /// Horizontal accuracy radius in meters
    pub accuracy: f64,

    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,

    /// Origin of the reading
    pub source: LocationSource,
}

impl LocationSample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        timestamp: DateTime<Utc>,
        source: LocationSource,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
            source,
        }
    }

    /// Creates a manual sample stamped with the current time and zero accuracy.
    #[must_use]
    pub fn manual(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, 0.0, Utc::now(), LocationSource::Manual)
    }

    /// Returns the position of this sample.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
