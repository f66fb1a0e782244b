//! Integration tests for the emergency override timer.
//!
//! Run on Tokio's paused clock, so the 30 minute TTL elapses instantly.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::policy_with;
use whereabouts_core::location::{Coordinate, LocationObfuscator};
use whereabouts_core::settings::{
    EmergencyError, EmergencyOverride, EmergencyState, PrecisionTier, SETTINGS_STORAGE_KEY,
    DEFAULT_EMERGENCY_TTL,
};
use whereabouts_core::storage::{KeyValueStore, MemoryKeyValueStore};

#[tokio::test(start_paused = true)]
async fn emergency_expires_after_thirty_minutes() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let policy = policy_with(PrecisionTier::AreaOnly, &store);
    let emergency = EmergencyOverride::new(policy.clone());

    emergency.activate().unwrap();
    assert_eq!(policy.current().precision, PrecisionTier::Exact);

    tokio::time::sleep(Duration::from_secs(30 * 60) + Duration::from_millis(1)).await;

    assert_eq!(emergency.state(), EmergencyState::default());
    assert_eq!(policy.current().precision, PrecisionTier::AreaOnly);
    assert_eq!(emergency.remaining(), None);
}

#[tokio::test(start_paused = true)]
async fn restored_tier_is_persisted() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let policy = policy_with(PrecisionTier::AreaOnly, &store);
    let emergency = EmergencyOverride::new(policy);

    emergency.activate().unwrap();
    tokio::time::sleep(DEFAULT_EMERGENCY_TTL + Duration::from_secs(1)).await;

    let bytes = store.get(SETTINGS_STORAGE_KEY).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["location_precision"], "area_only");
}

#[tokio::test(start_paused = true)]
async fn remaining_counts_down() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let emergency = EmergencyOverride::new(policy_with(PrecisionTier::Approximate, &store));

    emergency.activate().unwrap();
    tokio::time::sleep(Duration::from_secs(10 * 60)).await;

    assert_eq!(emergency.remaining(), Some(Duration::from_secs(20 * 60)));
}

#[tokio::test(start_paused = true)]
async fn manual_deactivation_cancels_timer() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let policy = policy_with(PrecisionTier::AreaOnly, &store);
    let emergency = EmergencyOverride::new(policy.clone());

    emergency.activate().unwrap();
    emergency.deactivate();
    // User picks a new tier; the cancelled timer must not touch it.
    policy.set_precision(PrecisionTier::Approximate);

    tokio::time::sleep(DEFAULT_EMERGENCY_TTL * 2).await;

    assert_eq!(policy.current().precision, PrecisionTier::Approximate);
}

#[tokio::test(start_paused = true)]
async fn reactivation_after_expiry_saves_current_tier() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let policy = policy_with(PrecisionTier::AreaOnly, &store);
    let emergency = EmergencyOverride::new(policy.clone());

    emergency.activate().unwrap();
    tokio::time::sleep(DEFAULT_EMERGENCY_TTL + Duration::from_secs(1)).await;
    policy.set_precision(PrecisionTier::Approximate);

    let state = emergency.activate().unwrap();

    assert_eq!(state.saved_prior_tier, Some(PrecisionTier::Approximate));
}

#[tokio::test(start_paused = true)]
async fn override_permission_gates_bypass() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let policy = policy_with(PrecisionTier::AreaOnly, &store);
    let emergency = EmergencyOverride::new(policy.clone());
    let obfuscator = LocationObfuscator::default();
    let raw = Coordinate::new(35.6812, 139.7671);

    emergency.activate().unwrap();
    // Tier lowered mid-emergency: the override still discloses raw.
    policy.set_precision(PrecisionTier::AreaOnly);
    assert_eq!(
        obfuscator.process_location(raw, &policy.current(), &emergency.state()),
        raw
    );

    policy.set_emergency_override(false);
    assert_ne!(
        obfuscator.process_location(raw, &policy.current(), &emergency.state()),
        raw
    );

    // Sharing off wins over the emergency.
    policy.set_emergency_override(true);
    policy.set_sharing(false);
    assert_eq!(
        obfuscator.process_location(raw, &policy.current(), &emergency.state()),
        obfuscator.undisclosed()
    );
}

#[test]
fn activation_requires_runtime() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let emergency = EmergencyOverride::new(policy_with(PrecisionTier::AreaOnly, &store));

    assert_eq!(emergency.activate(), Err(EmergencyError::NoRuntime));
}
