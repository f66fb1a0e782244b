//! Persistent key-value storage abstraction.
//!
//! Settings and track snapshots are written through [`KeyValueStore`], which
//! the embedding app implements on top of whatever the platform offers. An
//! `SQLite` implementation is provided for local use.
//!
//! # Failure Policy
//!
//! Callers in this crate treat every write as best-effort: failures are logged
//! and the in-memory state stays authoritative for the running process.

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod sqlite;

pub use error::{Result, StorageError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Trait for persistent byte-valued key-value storage.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; snapshot writes run on Tokio's
/// blocking pool while the tracker keeps accumulating.
///
/// # Example
///
/// ```ignore
/// use whereabouts_core::storage::{KeyValueStore, Result};
///
/// struct PlatformDefaults { /* ... */ }
///
/// impl KeyValueStore for PlatformDefaults {
///     fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
///         // Read from platform preferences
///         Ok(None)
///     }
///     // ... other methods
/// }
/// ```
pub trait KeyValueStore: Send + Sync {
    /// Retrieves the value stored under `key`.
    ///
    /// # Returns
    ///
    /// `Ok(Some(bytes))` if found, `Ok(None)` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval operation fails.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Deletes the value stored under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete(&self, key: &str) -> Result<()>;

    /// Lists all keys starting with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
