//! Privacy configuration types.
//!
//! These are plain values: every change produces a new [`PrivacySettings`]
//! through the `with_*` methods, and [`super::PrivacyPolicyStore`] swaps the
//! whole value in one step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How precisely the user's location is disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrecisionTier {
    /// Raw coordinates.
    Exact,
    /// Coordinates offset by random noise within a radius.
    #[default]
    Approximate,
    /// Coordinates snapped to a coarse grid.
    AreaOnly,
}

impl PrecisionTier {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Approximate => "approximate",
            Self::AreaOnly => "area_only",
        }
    }

    /// Parses from string representation.
    ///
    /// Unrecognized values fall back to [`PrecisionTier::Approximate`], so a
    /// corrupt or newer setting never discloses more than the default.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "exact" => Self::Exact,
            "area_only" => Self::AreaOnly,
            _ => Self::Approximate,
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Exact => "Exact",
            Self::Approximate => "Approximate",
            Self::AreaOnly => "Area only",
        }
    }
}

impl std::fmt::Display for PrecisionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PrecisionTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PrecisionTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Who can see the user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    /// Anyone.
    #[default]
    Public,
    /// Followers only.
    Followers,
    /// Nobody but the user.
    Private,
}

impl ProfileVisibility {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Followers => "followers",
            Self::Private => "private",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "followers" => Some(Self::Followers),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Retention policy for posts and location history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataRetentionSettings {
    /// Delete posts older than `retention_days`.
    pub auto_delete_posts: bool,
    /// Age limit in days.
    pub retention_days: u32,
    /// Delete recorded location history older than `retention_days`.
    pub delete_location_history: bool,
}

impl Default for DataRetentionSettings {
    fn default() -> Self {
        Self {
            auto_delete_posts: false,
            retention_days: 365,
            delete_location_history: false,
        }
    }
}

/// The user's privacy configuration.
///
/// # Examples
///
/// ```
/// use whereabouts_core::settings::{PrecisionTier, PrivacySettings};
///
/// let settings = PrivacySettings::default().with_precision(PrecisionTier::AreaOnly);
/// assert!(settings.location_sharing);
/// assert_eq!(settings.precision, PrecisionTier::AreaOnly);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Whether any location is disclosed at all.
    pub location_sharing: bool,
    /// Precision tier applied to disclosed coordinates.
    #[serde(rename = "location_precision")]
    pub precision: PrecisionTier,
    /// Profile visibility.
    pub profile_visibility: ProfileVisibility,
    /// Whether an active emergency may bypass obfuscation.
    pub emergency_override: bool,
    /// Retention policy.
    pub data_retention: DataRetentionSettings,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            location_sharing: true,
            precision: PrecisionTier::Approximate,
            profile_visibility: ProfileVisibility::Public,
            emergency_override: true,
            data_retention: DataRetentionSettings::default(),
        }
    }
}

impl PrivacySettings {
    /// Returns a copy with a different precision tier.
    #[must_use]
    pub const fn with_precision(self, precision: PrecisionTier) -> Self {
        Self { precision, ..self }
    }

    /// Returns a copy with location sharing toggled.
    #[must_use]
    pub const fn with_sharing(self, location_sharing: bool) -> Self {
        Self {
            location_sharing,
            ..self
        }
    }

    /// Returns a copy with a different profile visibility.
    #[must_use]
    pub const fn with_profile_visibility(self, profile_visibility: ProfileVisibility) -> Self {
        Self {
            profile_visibility,
            ..self
        }
    }

    /// Returns a copy with the emergency override permission toggled.
    #[must_use]
    pub const fn with_emergency_override(self, emergency_override: bool) -> Self {
        Self {
            emergency_override,
            ..self
        }
    }

    /// Returns a copy with a different retention policy.
    #[must_use]
    pub const fn with_data_retention(self, data_retention: DataRetentionSettings) -> Self {
        Self {
            data_retention,
            ..self
        }
    }
}

/// Snapshot of the emergency override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmergencyState {
    /// Whether the override is active.
    pub active: bool,
    /// When the current activation began.
    pub activated_at: Option<DateTime<Utc>>,
    /// Tier to restore on deactivation.
    pub saved_prior_tier: Option<PrecisionTier>,
}
