//! Live tracking for Whereabouts.
//!
//! Records a movement path from a stream of raw positions:
//! - [`TrackTracker`] accumulates the obfuscated path, distance and speed
//! - [`TrackingHandle`] runs a tracker as a single-owner Tokio task
//! - [`simplify`] and [`smooth`] post-process a recorded path
//!
//! # Persistence
//!
//! Every tenth point a snapshot of the session is written in the background
//! under `tracking.temp.<id>`. Stopping writes the finished session under
//! `tracking.session.<id>` and removes the in-progress snapshot. Failed
//! writes are logged and never interrupt recording.

pub mod actor;
pub mod error;
pub mod path;
pub mod source;
pub mod tracker;
pub mod types;

pub use actor::{TrackingHandle, TrackingStatus};
pub use error::TrackingError;
pub use path::{simplify, smooth, DEFAULT_SIMPLIFY_TOLERANCE_METERS, DEFAULT_SMOOTHING_WINDOW};
pub use source::{ChannelPositionSource, PermissionState, PositionEvent, PositionSource};
pub use tracker::{
    TrackTracker, DEFAULT_SNAPSHOT_INTERVAL, SESSION_SNAPSHOT_PREFIX, TEMP_SNAPSHOT_PREFIX,
};
pub use types::{AccuracyProfile, DesiredAccuracy, TrackSession, TrackerState, TrackingMode};
