//! Authenticated encryption of location records at rest.
//!
//! A [`LocationSample`] is serialized to JSON and sealed with AES-256-GCM
//! under a fresh random 96-bit nonce. The resulting blob layout is:
//!
//! ```text
//! +-----------+---------------------------+-------------+
//! | nonce(12) | ciphertext (len of JSON)  | GCM tag(16) |
//! +-----------+---------------------------+-------------+
//! ```
//!
//! # Security
//!
//! - Every blob authenticates its whole content; any flipped, dropped or
//!   appended byte makes [`LocationCipher::decrypt`] fail.
//! - Decryption never returns partially-decrypted or best-guess coordinates.
//! - Key bytes are wiped from memory when a [`LocationKey`] is dropped.
//!
//! # Known Gap
//!
//! [`PassphraseKeyProvider`] derives the key from a fixed passphrase with a
//! single SHA-256. It exists so the cipher can be exercised end-to-end and
//! must be replaced by a platform keystore-backed [`KeyMaterialProvider`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::error::{CipherError, Result};
use super::types::LocationSample;

/// AES-GCM standard nonce size.
const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key for location records.
///
/// Zeroized on drop. Equality is constant-time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocationKey([u8; 32]);

impl LocationKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for LocationKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for LocationKey {}

impl std::fmt::Debug for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LocationKey(<redacted>)")
    }
}

/// Supplies the symmetric key used for location records.
///
/// Implementations are expected to fetch key material from platform secure
/// storage (iOS Keychain, Android Keystore, ...).
pub trait KeyMaterialProvider: Send + Sync {
    /// Returns the current location key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`] if no key can be produced.
    fn location_key(&self) -> Result<LocationKey>;
}

/// Derives the key as `SHA-256(passphrase)`.
///
/// Placeholder only: a memorable passphrase hashed once is not a key
/// management model. Use a keystore-backed provider in production.
pub struct PassphraseKeyProvider {
    passphrase: Zeroizing<String>,
}

impl PassphraseKeyProvider {
    /// Creates a provider for the given passphrase.
    #[must_use]
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl std::fmt::Debug for PassphraseKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PassphraseKeyProvider(<redacted>)")
    }
}

impl KeyMaterialProvider for PassphraseKeyProvider {
    fn location_key(&self) -> Result<LocationKey> {
        if self.passphrase.is_empty() {
            return Err(CipherError::KeyUnavailable(
                "passphrase must not be empty".to_string(),
            ));
        }
        let digest = Sha256::digest(self.passphrase.as_bytes());
        Ok(LocationKey::from_bytes(digest.into()))
    }
}

/// Opaque sealed location record: `nonce ‖ ciphertext ‖ tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedLocationBlob {
    bytes: Vec<u8>,
}

impl EncryptedLocationBlob {
    /// Wraps bytes read back from storage.
    ///
    /// No validation happens here; [`LocationCipher::decrypt`] authenticates
    /// the content.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the raw blob bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the blob, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Encodes the blob as standard base64 for text-valued stores.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Decodes a blob from standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Encoding`] if the text is not valid base64.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        Ok(Self { bytes })
    }
}

/// Seals and opens location records.
///
/// Stateless; the key is passed to every call.
///
/// # Examples
///
/// ```
/// use whereabouts_core::location::{LocationCipher, LocationKey, LocationSample};
///
/// let cipher = LocationCipher::new();
/// let key = LocationKey::generate();
/// let sample = LocationSample::manual(35.6762, 139.6503);
///
/// let blob = cipher.encrypt(&sample, &key).unwrap();
/// let (lat, lon) = cipher.decrypt(&blob, &key).unwrap();
/// assert_eq!((lat, lon), (35.6762, 139.6503));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationCipher {
    _private: (),
}

impl LocationCipher {
    /// Creates a new `LocationCipher`.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Serializes and seals `sample`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails.
    pub fn encrypt(&self, sample: &LocationSample, key: &LocationKey) -> Result<EncryptedLocationBlob> {
        let plaintext = Zeroizing::new(serde_json::to_vec(sample)?);

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CipherError::Encryption(format!("cipher init failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| CipherError::Encryption(format!("encryption failed: {e}")))?;

        let mut bytes = Vec::with_capacity(NONCE_SIZE + sealed.len());
        bytes.extend_from_slice(&nonce_bytes);
        bytes.extend_from_slice(&sealed);
        Ok(EncryptedLocationBlob { bytes })
    }

    /// Seals a bare coordinate as a manual sample taken now.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails.
    pub fn encrypt_coordinate(
        &self,
        latitude: f64,
        longitude: f64,
        key: &LocationKey,
    ) -> Result<EncryptedLocationBlob> {
        self.encrypt(&LocationSample::manual(latitude, longitude), key)
    }

    /// Opens `blob` and returns its `(latitude, longitude)`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decryption`] if the blob does not authenticate
    /// under `key`.
    pub fn decrypt(&self, blob: &EncryptedLocationBlob, key: &LocationKey) -> Result<(f64, f64)> {
        let sample = self.decrypt_sample(blob, key)?;
        Ok((sample.latitude, sample.longitude))
    }

    /// Opens `blob` and returns the full sample.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Decryption`] if the blob does not authenticate
    /// under `key`, or a serialization error if an authentic blob does not
    /// hold a location record.
    pub fn decrypt_sample(
        &self,
        blob: &EncryptedLocationBlob,
        key: &LocationKey,
    ) -> Result<LocationSample> {
        if blob.bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Decryption(format!(
                "blob too short: {} bytes",
                blob.bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CipherError::Decryption(format!("cipher init failed: {e}")))?;

        let (nonce_bytes, sealed) = blob.bytes.split_at(NONCE_SIZE);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map(Zeroizing::new)
            .map_err(|_| CipherError::Decryption("authentication failed".to_string()))?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationSource;
    use chrono::{TimeZone, Utc};

    fn test_key() -> LocationKey {
        // A test key (NOT for production use)
        let mut key = [0u8; 32];
        key[0] = 0x42;
        key[31] = 0x42;
        LocationKey::from_bytes(key)
    }

    fn test_sample() -> LocationSample {
        LocationSample::new(
            35.681_236,
            139.767_125,
            12.5,
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
            LocationSource::Gps,
        )
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = LocationCipher::new();
        let key = test_key();
        let sample = test_sample();

        let blob = cipher.encrypt(&sample, &key).unwrap();

        assert_eq!(cipher.decrypt_sample(&blob, &key).unwrap(), sample);
        assert_eq!(
            cipher.decrypt(&blob, &key).unwrap(),
            (sample.latitude, sample.longitude)
        );
    }

    #[test]
    fn blob_layout_has_nonce_and_tag() {
        let cipher = LocationCipher::new();
        let sample = test_sample();
        let json_len = serde_json::to_vec(&sample).unwrap().len();

        let blob = cipher.encrypt(&sample, &test_key()).unwrap();

        assert_eq!(blob.as_bytes().len(), NONCE_SIZE + json_len + TAG_SIZE);
    }

    #[test]
    fn encrypt_produces_different_blobs_each_time() {
        let cipher = LocationCipher::new();
        let key = test_key();
        let sample = test_sample();

        let b1 = cipher.encrypt(&sample, &key).unwrap();
        let b2 = cipher.encrypt(&sample, &key).unwrap();

        // Due to random nonce, blobs should be different
        assert_ne!(b1, b2);
        assert_eq!(cipher.decrypt_sample(&b1, &key).unwrap(), sample);
        assert_eq!(cipher.decrypt_sample(&b2, &key).unwrap(), sample);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let cipher = LocationCipher::new();
        let mut other = *test_key().as_bytes();
        other[15] = 0xFF;

        let blob = cipher.encrypt(&test_sample(), &test_key()).unwrap();
        let result = cipher.decrypt(&blob, &LocationKey::from_bytes(other));

        assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    #[test]
    fn decrypt_truncated_blob_fails() {
        let cipher = LocationCipher::new();
        let key = test_key();
        let blob = cipher.encrypt(&test_sample(), &key).unwrap();

        let mut bytes = blob.into_bytes();
        bytes.truncate(bytes.len() - 1);
        let result = cipher.decrypt(&EncryptedLocationBlob::from_bytes(bytes), &key);

        assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    #[test]
    fn decrypt_short_blob_fails() {
        let cipher = LocationCipher::new();
        let blob = EncryptedLocationBlob::from_bytes(vec![0u8; NONCE_SIZE + TAG_SIZE - 1]);
        assert!(matches!(
            cipher.decrypt(&blob, &test_key()),
            Err(CipherError::Decryption(_))
        ));
    }

    #[test]
    fn decrypt_foreign_bytes_fails() {
        let cipher = LocationCipher::new();
        let blob = EncryptedLocationBlob::from_bytes(b"{\"latitude\":1.0,\"longitude\":2.0}".to_vec());
        assert!(matches!(
            cipher.decrypt(&blob, &test_key()),
            Err(CipherError::Decryption(_))
        ));
    }

    #[test]
    fn decrypt_corrupted_blob_fails() {
        let cipher = LocationCipher::new();
        let key = test_key();
        let mut bytes = cipher.encrypt(&test_sample(), &key).unwrap().into_bytes();
        bytes[NONCE_SIZE + 3] ^= 0xFF;

        let result = cipher.decrypt(&EncryptedLocationBlob::from_bytes(bytes), &key);
        assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    #[test]
    fn encrypt_coordinate_uses_manual_source() {
        let cipher = LocationCipher::new();
        let key = test_key();

        let blob = cipher.encrypt_coordinate(35.0, 139.0, &key).unwrap();
        let sample = cipher.decrypt_sample(&blob, &key).unwrap();

        assert_eq!(sample.source, LocationSource::Manual);
        assert_eq!(sample.accuracy, 0.0);
        assert_eq!((sample.latitude, sample.longitude), (35.0, 139.0));
    }

    #[test]
    fn base64_roundtrip_preserves_blob() {
        let cipher = LocationCipher::new();
        let key = test_key();
        let blob = cipher.encrypt(&test_sample(), &key).unwrap();

        let decoded = EncryptedLocationBlob::from_base64(&blob.to_base64()).unwrap();

        assert_eq!(decoded, blob);
        assert!(EncryptedLocationBlob::from_base64("not-valid-base64!!!").is_err());
    }

    #[test]
    fn blob_does_not_contain_plaintext_json() {
        let cipher = LocationCipher::new();
        let blob = cipher.encrypt(&test_sample(), &test_key()).unwrap();
        let haystack = String::from_utf8_lossy(blob.as_bytes());
        assert!(!haystack.contains("latitude"));
    }

    #[test]
    fn passphrase_provider_is_deterministic() {
        let a = PassphraseKeyProvider::new("correct horse").location_key().unwrap();
        let b = PassphraseKeyProvider::new("correct horse").location_key().unwrap();
        let c = PassphraseKeyProvider::new("battery staple").location_key().unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn passphrase_provider_rejects_empty() {
        let result = PassphraseKeyProvider::new("").location_key();
        assert!(matches!(result, Err(CipherError::KeyUnavailable(_))));
    }

    #[test]
    fn key_debug_is_redacted() {
        let debug = format!("{:?}", test_key());
        assert_eq!(debug, "LocationKey(<redacted>)");
        let provider = format!("{:?}", PassphraseKeyProvider::new("secret"));
        assert!(!provider.contains("secret"));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(LocationKey::generate(), LocationKey::generate());
    }
}
