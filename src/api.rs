//! Engine facade wiring the privacy, cipher, emergency and tracking
//! components together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::location::{
    CipherError, Coordinate, EncryptedLocationBlob, KeyMaterialProvider, LocationCipher,
    LocationObfuscator, LocationSample, NoiseSource, ThreadNoise,
};
use crate::settings::{
    self, DataRetentionSettings, EmergencyError, EmergencyOverride, EmergencyState,
    ExposureReport, PrecisionTier, PrivacyPolicyStore, PrivacySettings, ProfileVisibility,
};
use crate::storage::{self, KeyValueStore};
use crate::tracking::{self, PositionEvent, PositionSource, TrackTracker, TrackingHandle};

/// Entry point for all location privacy and tracking operations.
///
/// Every collaborator is injected: the persistent store, the key provider,
/// and optionally the noise source. Nothing is global, so several engines
/// (for example one per test) can coexist.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use whereabouts_core::config::EngineConfig;
/// use whereabouts_core::location::{Coordinate, PassphraseKeyProvider};
/// use whereabouts_core::settings::PrecisionTier;
/// use whereabouts_core::storage::SqliteKeyValueStore;
/// use whereabouts_core::LocationEngine;
///
/// let store = Arc::new(SqliteKeyValueStore::in_memory().unwrap());
/// let keys = Arc::new(PassphraseKeyProvider::new("correct horse battery staple"));
/// let engine = LocationEngine::new(EngineConfig::default(), store, keys);
///
/// engine.set_precision(PrecisionTier::Exact);
/// let raw = Coordinate::new(35.6812, 139.7671);
/// assert_eq!(engine.process_location(raw), raw);
/// ```
pub struct LocationEngine {
    config: EngineConfig,
    store: Arc<dyn KeyValueStore>,
    keys: Arc<dyn KeyMaterialProvider>,
    policy: Arc<PrivacyPolicyStore>,
    emergency: EmergencyOverride,
    obfuscator: Arc<LocationObfuscator>,
    cipher: LocationCipher,
}

impl std::fmt::Debug for LocationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationEngine")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("emergency", &self.emergency)
            .finish_non_exhaustive()
    }
}

impl LocationEngine {
    /// Creates an engine, restoring persisted privacy settings from `store`.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn KeyValueStore>,
        keys: Arc<dyn KeyMaterialProvider>,
    ) -> Self {
        Self::with_noise(config, store, keys, Box::new(ThreadNoise))
    }

    /// Creates an engine with an explicit noise source for `Approximate`.
    #[must_use]
    pub fn with_noise(
        config: EngineConfig,
        store: Arc<dyn KeyValueStore>,
        keys: Arc<dyn KeyMaterialProvider>,
        noise: Box<dyn NoiseSource>,
    ) -> Self {
        let policy = Arc::new(PrivacyPolicyStore::load(Arc::clone(&store)));
        let emergency = EmergencyOverride::with_ttl(Arc::clone(&policy), config.emergency.ttl());
        let obfuscator = Arc::new(LocationObfuscator::new(
            config.privacy.undisclosed(),
            config.privacy.approximate_radius_m,
            config.privacy.area_grid_m,
            noise,
        ));

        tracing::info!(
            precision = %policy.current().precision,
            emergency_ttl_secs = config.emergency.ttl_secs,
            "Location engine initialized"
        );

        Self {
            config,
            store,
            keys,
            policy,
            emergency,
            obfuscator,
            cipher: LocationCipher::new(),
        }
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==================== Privacy ====================

    /// Computes the coordinate to disclose for `raw` under the current
    /// settings and emergency state.
    #[must_use]
    pub fn process_location(&self, raw: Coordinate) -> Coordinate {
        self.obfuscator
            .process_location(raw, &self.policy.current(), &self.emergency.state())
    }

    /// Current privacy settings.
    #[must_use]
    pub fn settings(&self) -> PrivacySettings {
        self.policy.current()
    }

    /// Sets the precision tier.
    pub fn set_precision(&self, precision: PrecisionTier) {
        self.policy.set_precision(precision);
    }

    /// Enables or disables location sharing.
    pub fn set_sharing(&self, enabled: bool) {
        self.policy.set_sharing(enabled);
    }

    /// Sets profile visibility.
    pub fn set_profile_visibility(&self, visibility: ProfileVisibility) {
        self.policy.set_profile_visibility(visibility);
    }

    /// Allows or forbids the emergency override from bypassing obfuscation.
    pub fn set_emergency_override(&self, allowed: bool) {
        self.policy.set_emergency_override(allowed);
    }

    /// Replaces the retention policy.
    pub fn set_data_retention(&self, retention: DataRetentionSettings) {
        self.policy.set_data_retention(retention);
    }

    /// Deletes recorded sessions older than the retention period, returning
    /// how many were removed.
    ///
    /// Does nothing unless `delete_location_history` is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a delete fails.
    pub fn cleanup_old_location_data(&self, now: DateTime<Utc>) -> storage::Result<usize> {
        if !self.settings().data_retention.delete_location_history {
            tracing::debug!("Location history cleanup disabled");
            return Ok(0);
        }
        let cutoff = self.policy.retention_cutoff(now);
        tracking::tracker::delete_sessions_before(self.store.as_ref(), cutoff)
    }

    /// Shared policy store.
    #[must_use]
    pub const fn policy(&self) -> &Arc<PrivacyPolicyStore> {
        &self.policy
    }

    // ==================== Emergency ====================

    /// Activates the emergency override (or restarts its countdown).
    ///
    /// # Errors
    ///
    /// Returns [`EmergencyError::NoRuntime`] outside a Tokio runtime.
    pub fn activate_emergency(&self) -> Result<EmergencyState, EmergencyError> {
        self.emergency.activate()
    }

    /// Deactivates the emergency override.
    pub fn deactivate_emergency(&self) -> EmergencyState {
        self.emergency.deactivate()
    }

    /// Current emergency state.
    #[must_use]
    pub fn emergency_state(&self) -> EmergencyState {
        self.emergency.state()
    }

    /// Shared emergency override.
    #[must_use]
    pub const fn emergency(&self) -> &EmergencyOverride {
        &self.emergency
    }

    // ==================== Encryption ====================

    /// Encrypts a location record with the provider's current key.
    ///
    /// # Errors
    ///
    /// Returns an error if no key is available or encryption fails.
    pub fn encrypt_location(
        &self,
        sample: &LocationSample,
    ) -> Result<EncryptedLocationBlob, CipherError> {
        let key = self.keys.location_key()?;
        self.cipher.encrypt(sample, &key)
    }

    /// Decrypts a location record, returning `(latitude, longitude)`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decryption`] for a blob that does not
    /// authenticate under the provider's key.
    pub fn decrypt_location(&self, blob: &EncryptedLocationBlob) -> Result<(f64, f64), CipherError> {
        let key = self.keys.location_key()?;
        self.cipher.decrypt(blob, &key)
    }

    /// Decrypts a location record, returning the full sample.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decryption`] for a blob that does not
    /// authenticate under the provider's key.
    pub fn decrypt_sample(&self, blob: &EncryptedLocationBlob) -> Result<LocationSample, CipherError> {
        let key = self.keys.location_key()?;
        self.cipher.decrypt_sample(blob, &key)
    }

    // ==================== Tracking ====================

    /// Builds an idle tracker bound to this engine's policy and store.
    #[must_use]
    pub fn tracker(&self, source: Arc<dyn PositionSource>) -> TrackTracker {
        TrackTracker::new(
            Arc::clone(&self.obfuscator),
            Arc::clone(&self.policy),
            self.emergency.clone(),
            source,
            Arc::clone(&self.store),
        )
        .with_snapshot_interval(self.config.tracking.snapshot_interval)
    }

    /// Spawns a tracking task fed by `events`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn_tracking<S>(
        &self,
        source: Arc<dyn PositionSource>,
        events: S,
    ) -> (TrackingHandle, JoinHandle<TrackTracker>)
    where
        S: Stream<Item = PositionEvent> + Send + Unpin + 'static,
    {
        TrackingHandle::spawn(self.tracker(source), events)
    }

    /// Simplifies `path` with the configured tolerance.
    #[must_use]
    pub fn simplify(&self, path: &[Coordinate]) -> Vec<Coordinate> {
        tracking::simplify(path, self.config.tracking.simplify_tolerance_m)
    }

    /// Smooths `path` with the configured window.
    #[must_use]
    pub fn smooth(&self, path: &[Coordinate]) -> Vec<Coordinate> {
        tracking::smooth(path, self.config.tracking.smoothing_window)
    }

    // ==================== Exposure ====================

    /// Scores how much precise location a post history has revealed.
    pub fn analyze_exposure<T>(
        &self,
        posts: &[T],
        effective_tier_of: impl Fn(&T) -> PrecisionTier,
    ) -> ExposureReport {
        settings::analyze(posts, effective_tier_of)
    }
}
