//! Privacy settings, the emergency override and exposure analysis.
//!
//! [`PrivacyPolicyStore`] owns the user's [`PrivacySettings`] and persists
//! every change. [`EmergencyOverride`] temporarily forces `Exact` precision
//! and restores the previous tier when it is deactivated or expires.

pub mod emergency;
pub mod error;
pub mod exposure;
pub mod store;
pub mod types;

pub use emergency::{EmergencyOverride, DEFAULT_EMERGENCY_TTL};
pub use error::EmergencyError;
pub use exposure::{analyze, ExposureLevel, ExposureReport};
pub use store::{PrivacyPolicyStore, SETTINGS_STORAGE_KEY};
pub use types::{
    DataRetentionSettings, EmergencyState, PrecisionTier, PrivacySettings, ProfileVisibility,
};
