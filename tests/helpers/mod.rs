//! Reusable test helpers for tracking and settings integration tests.
//!
//! Everything is wired with real components; only the persistent store is
//! swapped for the in-memory one from the `test-utils` feature.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use whereabouts_core::location::{LocationObfuscator, LocationSample, LocationSource, SeededNoise};
use whereabouts_core::settings::{
    EmergencyOverride, PrecisionTier, PrivacyPolicyStore, PrivacySettings,
};
use whereabouts_core::storage::MemoryKeyValueStore;
use whereabouts_core::tracking::{ChannelPositionSource, TrackTracker};

/// All collaborators of a tracker, kept reachable for assertions.
pub struct TrackerFixture {
    pub tracker: TrackTracker,
    pub source: Arc<ChannelPositionSource>,
    pub store: Arc<MemoryKeyValueStore>,
    pub policy: Arc<PrivacyPolicyStore>,
    pub emergency: EmergencyOverride,
}

/// Creates a policy store holding `tier` over a fresh in-memory store.
pub fn policy_with(tier: PrecisionTier, store: &Arc<MemoryKeyValueStore>) -> Arc<PrivacyPolicyStore> {
    Arc::new(PrivacyPolicyStore::new(
        PrivacySettings::default().with_precision(tier),
        store.clone(),
    ))
}

/// Builds an idle tracker whose policy starts at `tier`.
pub fn tracker_fixture(tier: PrecisionTier) -> TrackerFixture {
    let store = Arc::new(MemoryKeyValueStore::new());
    let policy = policy_with(tier, &store);
    let emergency = EmergencyOverride::new(policy.clone());
    let (source, _events) = ChannelPositionSource::new();
    let obfuscator =
        Arc::new(LocationObfuscator::default().with_noise(Box::new(SeededNoise::new(7))));

    let tracker = TrackTracker::new(
        obfuscator,
        policy.clone(),
        emergency.clone(),
        source.clone(),
        store.clone(),
    );

    TrackerFixture {
        tracker,
        source,
        store,
        policy,
        emergency,
    }
}

/// A GPS fix at the given position, stamped now.
pub fn gps_fix(latitude: f64, longitude: f64) -> LocationSample {
    LocationSample::new(latitude, longitude, 5.0, Utc::now(), LocationSource::Gps)
}
