//! Property-based tests for location record encryption.
//!
//! These tests verify:
//! - Sealing then opening returns the exact sample, bit for bit
//! - Any single flipped byte makes opening fail
//! - Truncated blobs and foreign keys never yield coordinates

// Decrypted floats are compared bit-exactly.
#![allow(clippy::float_cmp)]

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use whereabouts_core::location::{
    CipherError, EncryptedLocationBlob, LocationCipher, LocationKey, LocationSample,
    LocationSource,
};

fn source_strategy() -> impl Strategy<Value = LocationSource> {
    prop_oneof![
        Just(LocationSource::Gps),
        Just(LocationSource::Network),
        Just(LocationSource::Manual),
    ]
}

fn sample_strategy() -> impl Strategy<Value = LocationSample> {
    (
        -90.0..=90.0_f64,
        -180.0..=180.0_f64,
        0.0..5_000.0_f64,
        0_i64..4_000_000_000,
        0_u32..1_000_000_000,
        source_strategy(),
    )
        .prop_map(|(lat, lon, accuracy, secs, nanos, source)| {
            let timestamp = Utc
                .timestamp_opt(secs, nanos)
                .single()
                .expect("in-range timestamp");
            LocationSample::new(lat, lon, accuracy, timestamp, source)
        })
}

fn key_strategy() -> impl Strategy<Value = LocationKey> {
    any::<[u8; 32]>().prop_map(LocationKey::from_bytes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Every sample comes back exactly as sealed.
    #[test]
    fn roundtrip_is_bit_exact(sample in sample_strategy(), key in key_strategy()) {
        let cipher = LocationCipher::new();
        let blob = cipher.encrypt(&sample, &key).unwrap();

        let opened = cipher.decrypt_sample(&blob, &key).unwrap();
        prop_assert_eq!(opened.latitude.to_bits(), sample.latitude.to_bits());
        prop_assert_eq!(opened.longitude.to_bits(), sample.longitude.to_bits());
        prop_assert_eq!(opened, sample);

        let (lat, lon) = cipher.decrypt(&blob, &key).unwrap();
        prop_assert_eq!((lat, lon), (sample.latitude, sample.longitude));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Flipping any bit of any byte is detected.
    #[test]
    fn single_byte_tamper_detected(
        sample in sample_strategy(),
        key in key_strategy(),
        position in any::<prop::sample::Index>(),
        mask in 1_u8..=255,
    ) {
        let cipher = LocationCipher::new();
        let mut bytes = cipher.encrypt(&sample, &key).unwrap().into_bytes();
        let index = position.index(bytes.len());
        bytes[index] ^= mask;

        let result = cipher.decrypt(&EncryptedLocationBlob::from_bytes(bytes), &key);
        prop_assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    /// Dropping trailing bytes is detected.
    #[test]
    fn truncation_detected(
        sample in sample_strategy(),
        key in key_strategy(),
        cut in 1_usize..64,
    ) {
        let cipher = LocationCipher::new();
        let mut bytes = cipher.encrypt(&sample, &key).unwrap().into_bytes();
        let keep = bytes.len().saturating_sub(cut);
        bytes.truncate(keep);

        let result = cipher.decrypt(&EncryptedLocationBlob::from_bytes(bytes), &key);
        prop_assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    /// A blob sealed under one key never opens under another.
    #[test]
    fn foreign_key_rejected(
        sample in sample_strategy(),
        key in key_strategy(),
        other in key_strategy(),
    ) {
        prop_assume!(key != other);
        let cipher = LocationCipher::new();
        let blob = cipher.encrypt(&sample, &key).unwrap();

        prop_assert!(cipher.decrypt(&blob, &other).is_err());
    }
}

#[test]
fn base64_roundtrip_preserves_blob() {
    let cipher = LocationCipher::new();
    let key = LocationKey::generate();
    let sample = LocationSample::manual(0.0, -180.0);

    let blob = cipher.encrypt(&sample, &key).unwrap();
    let restored = EncryptedLocationBlob::from_base64(&blob.to_base64()).unwrap();

    assert_eq!(restored, blob);
    assert_eq!(cipher.decrypt(&restored, &key).unwrap(), (0.0, -180.0));
}

#[test]
fn invalid_base64_is_encoding_error() {
    let result = EncryptedLocationBlob::from_base64("%%% not base64 %%%");
    assert!(matches!(result, Err(CipherError::Encoding(_))));
}
