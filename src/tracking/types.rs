//! Core types for live tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::location::Coordinate;

/// Tracking mode, selecting an [`AccuracyProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Regular tracking.
    #[default]
    Standard,
    /// Coarse tracking that saves battery.
    PowerSaving,
    /// Highest accuracy for navigation.
    HighPrecision,
    /// High frequency tracking during an emergency.
    Emergency,
}

impl TrackingMode {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::PowerSaving => "power_saving",
            Self::HighPrecision => "high_precision",
            Self::Emergency => "emergency",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "power_saving" => Some(Self::PowerSaving),
            "high_precision" => Some(Self::HighPrecision),
            "emergency" => Some(Self::Emergency),
            _ => None,
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Tracking with standard accuracy",
            Self::PowerSaving => "Tracking with reduced battery usage",
            Self::HighPrecision => "Tracking with the highest accuracy",
            Self::Emergency => "High frequency tracking for emergencies",
        }
    }

    /// Accuracy profile requested from the position source in this mode.
    #[must_use]
    pub const fn profile(&self) -> AccuracyProfile {
        match self {
            Self::Standard => AccuracyProfile {
                accuracy: DesiredAccuracy::Best,
                distance_filter_m: 10.0,
            },
            Self::PowerSaving => AccuracyProfile {
                accuracy: DesiredAccuracy::HundredMeters,
                distance_filter_m: 100.0,
            },
            Self::HighPrecision => AccuracyProfile {
                accuracy: DesiredAccuracy::BestForNavigation,
                distance_filter_m: 5.0,
            },
            Self::Emergency => AccuracyProfile {
                accuracy: DesiredAccuracy::BestForNavigation,
                distance_filter_m: 1.0,
            },
        }
    }
}

impl std::fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accuracy class requested from the positioning hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredAccuracy {
    /// Best available accuracy.
    Best,
    /// Within roughly 100 meters.
    HundredMeters,
    /// Navigation grade, with sensor fusion.
    BestForNavigation,
}

/// Accuracy class and minimum movement between updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyProfile {
    /// Requested accuracy class.
    pub accuracy: DesiredAccuracy,
    /// Minimum movement in meters before a new position is delivered.
    pub distance_filter_m: f64,
}

/// State of a [`super::TrackTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No session in progress.
    Idle,
    /// Accepting position updates.
    Recording,
    /// Session in progress, position updates suspended.
    Paused,
}

impl TrackerState {
    /// Converts to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TrackerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded movement path.
///
/// Points are obfuscated coordinates; distance and speed are measured on the
/// raw positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// When recording started.
    pub start_time: DateTime<Utc>,
    /// When recording stopped, `None` while in progress.
    pub end_time: Option<DateTime<Utc>>,
    /// Disclosed path points, in arrival order.
    pub points: Vec<Coordinate>,
    /// Accumulated great-circle distance in meters.
    pub total_distance_m: f64,
    /// Total distance over elapsed time, in meters per second.
    pub average_speed_mps: f64,
    /// Mode the session was recorded in.
    pub mode: TrackingMode,
}

impl TrackSession {
    /// Starts an empty session.
    #[must_use]
    pub fn new(mode: TrackingMode, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time: None,
            points: Vec::new(),
            total_distance_m: 0.0,
            average_speed_mps: 0.0,
            mode,
        }
    }

    /// Elapsed time between start and end (or now, if still recording).
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }

    /// Duration as `MM:SS`, or `HH:MM:SS` from one hour on.
    #[must_use]
    pub fn formatted_duration(&self) -> String {
        let total = self.duration().num_seconds().max(0);
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        if hours > 0 {
            format!("{hours:02}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes:02}:{seconds:02}")
        }
    }

    /// Distance as whole meters below 1 km, otherwise kilometers with two decimals.
    #[must_use]
    pub fn formatted_distance(&self) -> String {
        if self.total_distance_m < 1000.0 {
            format!("{:.0}m", self.total_distance_m)
        } else {
            format!("{:.2}km", self.total_distance_m / 1000.0)
        }
    }

    /// Average speed in km/h with one decimal.
    #[must_use]
    pub fn formatted_speed(&self) -> String {
        format!("{:.1}km/h", self.average_speed_mps * 3.6)
    }
}
