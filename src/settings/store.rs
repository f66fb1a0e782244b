//! Persistent holder of the user's privacy settings.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use super::types::{DataRetentionSettings, PrecisionTier, PrivacySettings, ProfileVisibility};
use crate::storage::KeyValueStore;

/// Storage key under which settings are persisted as JSON.
pub const SETTINGS_STORAGE_KEY: &str = "location_privacy_settings";

/// Holds the current [`PrivacySettings`] and writes every change through to
/// a [`KeyValueStore`].
///
/// The in-memory value is authoritative. A failed write is logged and the
/// new settings still take effect for this process.
pub struct PrivacyPolicyStore {
    settings: RwLock<PrivacySettings>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for PrivacyPolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivacyPolicyStore")
            .field("settings", &self.current())
            .finish_non_exhaustive()
    }
}

impl PrivacyPolicyStore {
    /// Creates a store holding `settings` without reading persisted state.
    #[must_use]
    pub fn new(settings: PrivacySettings, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings: RwLock::new(settings),
            store,
        }
    }

    /// Restores persisted settings, falling back to defaults when nothing
    /// usable is stored.
    #[must_use]
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match store.get(SETTINGS_STORAGE_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<PrivacySettings>(&bytes) {
                Ok(settings) => {
                    tracing::debug!(precision = %settings.precision, "Restored privacy settings");
                    settings
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored privacy settings are undecodable, using defaults");
                    PrivacySettings::default()
                }
            },
            Ok(None) => PrivacySettings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read privacy settings, using defaults");
                PrivacySettings::default()
            }
        };
        Self::new(settings, store)
    }

    /// Returns the current settings.
    #[must_use]
    pub fn current(&self) -> PrivacySettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the precision tier.
    pub fn set_precision(&self, precision: PrecisionTier) {
        self.update(|settings| settings.with_precision(precision));
    }

    /// Enables or disables location sharing.
    pub fn set_sharing(&self, enabled: bool) {
        self.update(|settings| settings.with_sharing(enabled));
    }

    /// Sets profile visibility.
    pub fn set_profile_visibility(&self, visibility: ProfileVisibility) {
        self.update(|settings| settings.with_profile_visibility(visibility));
    }

    /// Allows or forbids the emergency override from bypassing obfuscation.
    pub fn set_emergency_override(&self, allowed: bool) {
        self.update(|settings| settings.with_emergency_override(allowed));
    }

    /// Replaces the retention policy.
    pub fn set_data_retention(&self, retention: DataRetentionSettings) {
        self.update(|settings| settings.with_data_retention(retention));
    }

    /// Oldest timestamp that survives the retention policy at `now`.
    ///
    /// Location data recorded before the returned instant is eligible for
    /// cleanup when `delete_location_history` is enabled. A retention period
    /// reaching past the earliest representable date keeps everything.
    #[must_use]
    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = self.current().data_retention.retention_days;
        Duration::try_days(i64::from(days))
            .and_then(|retention| now.checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    // Persists under the write lock so concurrent setters reach storage in
    // the same order they took effect.
    fn update(&self, change: impl FnOnce(PrivacySettings) -> PrivacySettings) {
        let mut guard = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let updated = change(*guard);
        *guard = updated;

        match serde_json::to_vec(&updated) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(SETTINGS_STORAGE_KEY, &bytes) {
                    tracing::warn!(error = %e, "Failed to persist privacy settings");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode privacy settings"),
        }
        drop(guard);

        tracing::info!(
            sharing = updated.location_sharing,
            precision = %updated.precision,
            "Privacy settings updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn memory() -> Arc<MemoryKeyValueStore> {
        Arc::new(MemoryKeyValueStore::new())
    }

    #[test]
    fn load_without_persisted_state_uses_defaults() {
        let policy = PrivacyPolicyStore::load(memory());
        assert_eq!(policy.current(), PrivacySettings::default());
    }

    #[test]
    fn setter_persists_and_reloads() {
        let store = memory();
        let policy = PrivacyPolicyStore::load(store.clone());

        policy.set_precision(PrecisionTier::AreaOnly);
        policy.set_sharing(false);

        let reloaded = PrivacyPolicyStore::load(store);
        assert_eq!(reloaded.current().precision, PrecisionTier::AreaOnly);
        assert!(!reloaded.current().location_sharing);
    }

    #[test]
    fn persisted_json_uses_lowercase_tier() {
        let store = memory();
        let policy = PrivacyPolicyStore::load(store.clone());
        policy.set_precision(PrecisionTier::AreaOnly);

        let bytes = store.get(SETTINGS_STORAGE_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["location_precision"], "area_only");
    }

    #[test]
    fn failed_persistence_keeps_in_memory_value() {
        let store = memory();
        let policy = PrivacyPolicyStore::load(store.clone());
        store.set_failing(true);

        policy.set_precision(PrecisionTier::Exact);

        assert_eq!(policy.current().precision, PrecisionTier::Exact);
        store.set_failing(false);
        assert!(store.get(SETTINGS_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn undecodable_state_falls_back_to_defaults() {
        let store = memory();
        store.set(SETTINGS_STORAGE_KEY, b"not json").unwrap();

        let policy = PrivacyPolicyStore::load(store);
        assert_eq!(policy.current(), PrivacySettings::default());
    }

    #[test]
    fn unknown_persisted_tier_loads_as_approximate() {
        let store = memory();
        store
            .set(
                SETTINGS_STORAGE_KEY,
                br#"{"location_sharing":true,"location_precision":"city"}"#,
            )
            .unwrap();

        let policy = PrivacyPolicyStore::load(store);
        assert_eq!(policy.current().precision, PrecisionTier::Approximate);
    }

    #[test]
    fn remaining_setters_apply() {
        let policy = PrivacyPolicyStore::load(memory());
        policy.set_profile_visibility(ProfileVisibility::Followers);
        policy.set_emergency_override(false);
        policy.set_data_retention(DataRetentionSettings {
            auto_delete_posts: true,
            retention_days: 30,
            delete_location_history: true,
        });

        let current = policy.current();
        assert_eq!(current.profile_visibility, ProfileVisibility::Followers);
        assert!(!current.emergency_override);
        assert_eq!(current.data_retention.retention_days, 30);
    }

    #[test]
    fn retention_cutoff_saturates_for_huge_periods() {
        let policy = PrivacyPolicyStore::load(memory());
        policy.set_data_retention(DataRetentionSettings {
            auto_delete_posts: false,
            retention_days: u32::MAX,
            delete_location_history: true,
        });

        assert_eq!(policy.retention_cutoff(Utc::now()), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn retention_cutoff_subtracts_days() {
        let policy = PrivacyPolicyStore::load(memory());
        let now = Utc::now();
        assert_eq!(policy.retention_cutoff(now), now - Duration::days(365));
    }
}
