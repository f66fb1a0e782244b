//! Error types for location encryption.

use thiserror::Error;

/// Errors that can occur while sealing or opening location records.
#[derive(Error, Debug)]
pub enum CipherError {
    /// Encryption operation failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The blob did not authenticate under the given key.
    ///
    /// Covers wrong keys, tampered or truncated blobs and bytes that were
    /// never produced by the cipher. No coordinate is ever returned alongside it.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Serialization of the location record failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Text encoding of a blob was malformed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No key material could be obtained.
    #[error("Key unavailable: {0}")]
    KeyUnavailable(String),
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CipherError>;

impl From<base64::DecodeError> for CipherError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Encoding(e.to_string())
    }
}
