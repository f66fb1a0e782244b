//! Location module for Whereabouts.
//!
//! Provides the privacy transforms applied to every position before it leaves
//! the device:
//! - Coordinate obfuscation driven by the user's precision tier
//! - Authenticated encryption of location records at rest
//! - Spherical distance helpers shared with tracking and path processing
//!
//! # Privacy Guarantees
//!
//! - Coordinates are obfuscated before they are stored in a track
//! - Stored location records are sealed with AES-256-GCM
//! - Decryption either returns the exact record or fails
//!
//! # Example Usage
//!
//! ```
//! use whereabouts_core::location::{Coordinate, LocationObfuscator};
//! use whereabouts_core::settings::{EmergencyState, PrecisionTier, PrivacySettings};
//!
//! let obfuscator = LocationObfuscator::default();
//! let settings = PrivacySettings::default().with_precision(PrecisionTier::AreaOnly);
//!
//! let disclosed = obfuscator.process_location(
//!     Coordinate::new(35.6762, 139.6503),
//!     &settings,
//!     &EmergencyState::default(),
//! );
//! println!("Disclosed: {}, {}", disclosed.latitude, disclosed.longitude);
//! ```

pub mod cipher;
pub mod error;
pub mod geo;
pub mod privacy;
pub mod types;

pub use cipher::{
    EncryptedLocationBlob, KeyMaterialProvider, LocationCipher, LocationKey, PassphraseKeyProvider,
};
pub use error::CipherError;
pub use privacy::{LocationObfuscator, NoiseSource, SeededNoise, ThreadNoise};
pub use types::{Coordinate, LocationSample, LocationSource};
