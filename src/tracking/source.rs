//! Position source abstraction.
//!
//! The positioning hardware lives outside this crate. The platform layer
//! implements [`PositionSource`] to start and stop delivery, and pushes
//! [`PositionEvent`]s into the tracking actor's event stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::channel::mpsc;

use super::types::AccuracyProfile;
use crate::location::LocationSample;

/// Location permission reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Location access granted.
    Granted,
    /// The user denied location access.
    Denied,
    /// Location access is blocked by device policy.
    Restricted,
}

impl PermissionState {
    /// Whether positions can be delivered under this permission.
    #[must_use]
    pub const fn allows_tracking(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Event delivered by a position source.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// A new raw position fix.
    Position(LocationSample),
    /// The location permission changed.
    Permission(PermissionState),
}

/// Controls delivery of raw positions.
///
/// Both calls return once the platform has accepted the request; no position
/// should be delivered after `unsubscribe` returns.
pub trait PositionSource: Send + Sync {
    /// Starts (or reconfigures) delivery with the given accuracy profile.
    fn subscribe(&self, profile: AccuracyProfile);

    /// Stops delivery.
    fn unsubscribe(&self);
}

/// Position source backed by an unbounded channel.
///
/// The platform bridge calls [`ChannelPositionSource::push`] for every fix;
/// positions pushed while unsubscribed are dropped. Permission changes are
/// always forwarded.
#[derive(Debug)]
pub struct ChannelPositionSource {
    subscribed: AtomicBool,
    profile: Mutex<Option<AccuracyProfile>>,
    sender: mpsc::UnboundedSender<PositionEvent>,
}

impl ChannelPositionSource {
    /// Creates the source and the event stream to hand to the tracking actor.
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PositionEvent>) {
        let (sender, receiver) = mpsc::unbounded();
        let source = Arc::new(Self {
            subscribed: AtomicBool::new(false),
            profile: Mutex::new(None),
            sender,
        });
        (source, receiver)
    }

    /// Pushes an event, returning whether it was forwarded.
    pub fn push(&self, event: PositionEvent) -> bool {
        if matches!(event, PositionEvent::Position(_)) && !self.is_subscribed() {
            tracing::trace!("Dropping position delivered while unsubscribed");
            return false;
        }
        self.sender.unbounded_send(event).is_ok()
    }

    /// Whether delivery is currently requested.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Profile requested by the most recent `subscribe`.
    #[must_use]
    pub fn profile(&self) -> Option<AccuracyProfile> {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionSource for ChannelPositionSource {
    fn subscribe(&self, profile: AccuracyProfile) {
        *self.profile.lock().unwrap_or_else(PoisonError::into_inner) = Some(profile);
        self.subscribed.store(true, Ordering::SeqCst);
        tracing::debug!(
            accuracy = ?profile.accuracy,
            distance_filter_m = profile.distance_filter_m,
            "Position updates subscribed"
        );
    }

    fn unsubscribe(&self) {
        self.subscribed.store(false, Ordering::SeqCst);
        tracing::debug!("Position updates unsubscribed");
    }
}
