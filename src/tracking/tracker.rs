//! Live track recording.
//!
//! [`TrackTracker`] owns one recording session at a time:
//!
//! ```text
//!        start()          pause()
//! Idle ──────────▶ Recording ◀────▶ Paused
//!  ▲                   │   resume()   │
//!  └────── stop() ─────┴──────────────┘
//! ```
//!
//! Every accepted position is obfuscated before it is appended to the path.
//! Distance and speed are measured on the raw positions, so the statistics
//! stay accurate even when the stored path is coarse.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::time::Instant;

use super::error::{Result, TrackingError};
use super::source::{PositionEvent, PositionSource};
use super::types::{TrackSession, TrackerState, TrackingMode};
use crate::location::geo::great_circle_distance;
use crate::location::{Coordinate, LocationObfuscator, LocationSample};
use crate::settings::{EmergencyOverride, PrivacyPolicyStore};
use crate::storage::{self, KeyValueStore};

/// Key prefix for every persisted tracking record.
pub const TRACKING_KEY_PREFIX: &str = "tracking.";

/// Key prefix for periodic snapshots of an in-progress session.
pub const TEMP_SNAPSHOT_PREFIX: &str = "tracking.temp.";

/// Key prefix for finalized sessions.
pub const SESSION_SNAPSHOT_PREFIX: &str = "tracking.session.";

/// A snapshot is saved every this many points by default.
pub const DEFAULT_SNAPSHOT_INTERVAL: usize = 10;

/// Records a movement path from a stream of raw positions.
///
/// Not shared: a single owner drives the tracker, usually the task spawned
/// by [`super::TrackingHandle::spawn`].
pub struct TrackTracker {
    obfuscator: Arc<LocationObfuscator>,
    policy: Arc<PrivacyPolicyStore>,
    emergency: EmergencyOverride,
    source: Arc<dyn PositionSource>,
    store: Arc<dyn KeyValueStore>,
    snapshot_interval: usize,
    state: TrackerState,
    session: Option<TrackSession>,
    last_raw: Option<Coordinate>,
    started_at: Option<Instant>,
    snapshots: Arc<Mutex<SnapshotGate>>,
}

/// Orders the background snapshot writes of one session.
///
/// Writes happen under the lock, so once `closed` is set no snapshot of the
/// session can land afterwards.
#[derive(Debug, Default)]
struct SnapshotGate {
    closed: bool,
    written_points: usize,
}

impl std::fmt::Debug for TrackTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackTracker")
            .field("state", &self.state)
            .field("session", &self.session.as_ref().map(|s| s.id))
            .field("snapshot_interval", &self.snapshot_interval)
            .finish_non_exhaustive()
    }
}

impl TrackTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new(
        obfuscator: Arc<LocationObfuscator>,
        policy: Arc<PrivacyPolicyStore>,
        emergency: EmergencyOverride,
        source: Arc<dyn PositionSource>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            obfuscator,
            policy,
            emergency,
            source,
            store,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            state: TrackerState::Idle,
            session: None,
            last_raw: None,
            started_at: None,
            snapshots: Arc::default(),
        }
    }

    /// Changes how many points accumulate between periodic snapshots.
    ///
    /// An interval of 0 disables periodic snapshots.
    #[must_use]
    pub const fn with_snapshot_interval(mut self, interval: usize) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Starts a new session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] unless the tracker is idle.
    pub fn start(&mut self, mode: TrackingMode) -> Result<()> {
        self.require("start", self.state == TrackerState::Idle)?;

        let session = TrackSession::new(mode, Utc::now());
        tracing::info!(session_id = %session.id, mode = %mode, "Tracking started");

        self.session = Some(session);
        self.last_raw = None;
        self.started_at = Some(Instant::now());
        self.snapshots = Arc::default();
        self.state = TrackerState::Recording;
        self.source.subscribe(mode.profile());
        Ok(())
    }

    /// Activates the emergency override and starts an `Emergency` session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] unless the tracker is idle, or
    /// [`TrackingError::Emergency`] when the override cannot be scheduled.
    /// The tracker stays idle on error.
    pub fn start_emergency(&mut self) -> Result<()> {
        self.require("start emergency tracking", self.state == TrackerState::Idle)?;
        self.emergency.activate()?;
        self.start(TrackingMode::Emergency)
    }

    /// Accepts a raw position and returns the disclosed coordinate appended
    /// to the path.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] unless the tracker is recording.
    pub fn on_location_update(&mut self, sample: &LocationSample) -> Result<Coordinate> {
        let state = self.state;
        let (Some(session), TrackerState::Recording) = (self.session.as_mut(), state) else {
            return Err(TrackingError::InvalidState {
                operation: "accept location update",
                state,
            });
        };

        let raw = sample.coordinate();
        let disclosed = self.obfuscator.process_location(
            raw,
            &self.policy.current(),
            &self.emergency.state(),
        );
        session.points.push(disclosed);

        if let Some(previous) = self.last_raw {
            session.total_distance_m += great_circle_distance(previous, raw);
            let elapsed = self
                .started_at
                .map_or(0.0, |started| started.elapsed().as_secs_f64());
            session.average_speed_mps = if elapsed > 0.0 {
                session.total_distance_m / elapsed
            } else {
                0.0
            };
        }
        self.last_raw = Some(raw);

        if self.snapshot_interval > 0 && session.points.len() % self.snapshot_interval == 0 {
            save_in_background(&self.store, &self.snapshots, session);
        }

        Ok(disclosed)
    }

    /// Suspends position delivery, keeping the session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] unless the tracker is recording.
    pub fn pause(&mut self) -> Result<()> {
        self.require("pause", self.state == TrackerState::Recording)?;
        self.source.unsubscribe();
        self.state = TrackerState::Paused;
        tracing::info!("Tracking paused");
        Ok(())
    }

    /// Resumes position delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] unless the tracker is paused.
    pub fn resume(&mut self) -> Result<()> {
        self.require("resume", self.state == TrackerState::Paused)?;
        if let Some(session) = &self.session {
            self.source.subscribe(session.mode.profile());
        }
        self.state = TrackerState::Recording;
        tracing::info!("Tracking resumed");
        Ok(())
    }

    /// Ends the session, saves it, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] when the tracker is idle.
    pub fn stop(&mut self) -> Result<TrackSession> {
        let state = self.state;
        let Some(mut session) = self.session.take() else {
            return Err(TrackingError::InvalidState {
                operation: "stop",
                state,
            });
        };

        if state == TrackerState::Recording {
            self.source.unsubscribe();
        }
        session.end_time = Some(Utc::now());
        lock_gate(&self.snapshots).closed = true;

        // Nothing worth keeping without a single point.
        if !session.points.is_empty() {
            save_session(
                self.store.as_ref(),
                &format!("{SESSION_SNAPSHOT_PREFIX}{}", session.id),
                &session,
            );
        }

        let temp_key = format!("{TEMP_SNAPSHOT_PREFIX}{}", session.id);
        if let Err(e) = self.store.delete(&temp_key) {
            tracing::warn!(key = %temp_key, error = %e, "Failed to remove in-progress snapshot");
        }

        self.state = TrackerState::Idle;
        self.last_raw = None;
        self.started_at = None;

        tracing::info!(
            session_id = %session.id,
            points = session.points.len(),
            distance = %session.formatted_distance(),
            "Tracking stopped"
        );
        Ok(session)
    }

    /// Applies an event from the position source.
    ///
    /// Positions are recorded; a revoked permission pauses recording. Returns
    /// the disclosed coordinate for an accepted position.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidState`] for a position that arrives
    /// while the tracker is not recording.
    pub fn handle_event(&mut self, event: &PositionEvent) -> Result<Option<Coordinate>> {
        match event {
            PositionEvent::Position(sample) => self.on_location_update(sample).map(Some),
            PositionEvent::Permission(permission) if permission.allows_tracking() => {
                tracing::info!("Location permission granted");
                Ok(None)
            }
            PositionEvent::Permission(permission) => {
                tracing::warn!(?permission, state = %self.state, "Location permission revoked");
                if self.state == TrackerState::Recording {
                    self.pause()?;
                }
                Ok(None)
            }
        }
    }

    /// Loads every finalized session from storage, oldest first.
    ///
    /// Undecodable records are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn saved_sessions(&self) -> storage::Result<Vec<TrackSession>> {
        let mut sessions = Vec::new();
        for key in self.store.keys_with_prefix(SESSION_SNAPSHOT_PREFIX)? {
            let Some(bytes) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_slice::<TrackSession>(&bytes) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!(key = %key, error = %e, "Skipping undecodable session"),
            }
        }
        sessions.sort_by_key(|session| session.start_time);
        Ok(sessions)
    }

    /// Deletes finalized sessions that started before `cutoff`, returning how
    /// many were removed.
    ///
    /// Undecodable records are left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a delete fails.
    pub fn delete_history_before(&self, cutoff: DateTime<Utc>) -> storage::Result<usize> {
        delete_sessions_before(self.store.as_ref(), cutoff)
    }

    /// Deletes every persisted tracking record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed or a delete fails.
    pub fn delete_history(&self) -> storage::Result<usize> {
        let keys = self.store.keys_with_prefix(TRACKING_KEY_PREFIX)?;
        for key in &keys {
            self.store.delete(key)?;
        }
        tracing::info!(deleted = keys.len(), "Tracking history deleted");
        Ok(keys.len())
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// Session in progress, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&TrackSession> {
        self.session.as_ref()
    }

    /// Disclosed path of the session in progress.
    #[must_use]
    pub fn path(&self) -> &[Coordinate] {
        match &self.session {
            Some(session) => &session.points,
            None => &[],
        }
    }

    /// Accumulated distance of the session in progress, in meters.
    #[must_use]
    pub fn total_distance_m(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.total_distance_m)
    }

    /// Average speed of the session in progress, in meters per second.
    #[must_use]
    pub fn average_speed_mps(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.average_speed_mps)
    }

    /// Time since the session started, or `None` when idle.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.started_at.map(|started| started.elapsed())
    }

    fn require(&self, operation: &'static str, allowed: bool) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(TrackingError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

/// Removes `tracking.session.*` records whose session started before `cutoff`.
pub(crate) fn delete_sessions_before(
    store: &dyn KeyValueStore,
    cutoff: DateTime<Utc>,
) -> storage::Result<usize> {
    let mut deleted = 0;
    for key in store.keys_with_prefix(SESSION_SNAPSHOT_PREFIX)? {
        let Some(bytes) = store.get(&key)? else {
            continue;
        };
        match serde_json::from_slice::<TrackSession>(&bytes) {
            Ok(session) if session.start_time < cutoff => {
                store.delete(&key)?;
                deleted += 1;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Skipping undecodable session"),
        }
    }
    tracing::info!(deleted, %cutoff, "Old tracking sessions deleted");
    Ok(deleted)
}

fn save_session(store: &dyn KeyValueStore, key: &str, session: &TrackSession) -> bool {
    let bytes = match serde_json::to_vec(session) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to encode tracking snapshot");
            return false;
        }
    };
    match store.set(key, &bytes) {
        Ok(()) => {
            tracing::debug!(key = %key, points = session.points.len(), "Saved tracking snapshot");
            true
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to save tracking snapshot");
            false
        }
    }
}

fn lock_gate(gate: &Mutex<SnapshotGate>) -> std::sync::MutexGuard<'_, SnapshotGate> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

// Fire-and-forget: failures are logged and never affect the live session.
// A write that finishes after a newer one, or after `stop`, is dropped.
fn save_in_background(
    store: &Arc<dyn KeyValueStore>,
    gate: &Arc<Mutex<SnapshotGate>>,
    session: &TrackSession,
) {
    let Ok(handle) = Handle::try_current() else {
        tracing::warn!(session_id = %session.id, "No runtime for background snapshot, skipping");
        return;
    };
    let store = Arc::clone(store);
    let gate = Arc::clone(gate);
    let key = format!("{TEMP_SNAPSHOT_PREFIX}{}", session.id);
    let snapshot = session.clone();
    handle.spawn_blocking(move || {
        let mut gate = lock_gate(&gate);
        let points = snapshot.points.len();
        if gate.closed || points <= gate.written_points {
            tracing::debug!(key = %key, points, "Dropping stale tracking snapshot");
            return;
        }
        if save_session(store.as_ref(), &key, &snapshot) {
            gate.written_points = points;
        }
    });
}
