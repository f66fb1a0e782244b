//! Timed emergency override.
//!
//! While active, the precision tier is forced to `Exact` and (if the user
//! allows it) obfuscation is bypassed. Activation schedules a one-shot expiry
//! on the Tokio runtime; re-activating restarts that countdown.
//!
//! ```text
//!            activate()               activate() (restart timer)
//! Inactive ─────────────▶ Active ◀──────────────┐
//!    ▲                      │ └─────────────────┘
//!    └── deactivate() / TTL ┘
//! ```

// The control lock is held while the tier is swapped so that state and
// settings change together.
#![allow(clippy::significant_drop_tightening)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::error::{EmergencyError, Result};
use super::store::PrivacyPolicyStore;
use super::types::{EmergencyState, PrecisionTier};

/// How long an emergency stays active without re-activation.
pub const DEFAULT_EMERGENCY_TTL: Duration = Duration::from_secs(30 * 60);

/// Emergency override state machine.
///
/// Cloning yields another handle to the same override.
#[derive(Clone)]
pub struct EmergencyOverride {
    inner: Arc<Inner>,
}

struct Inner {
    policy: Arc<PrivacyPolicyStore>,
    ttl: Duration,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    state: EmergencyState,
    // Bumped on every transition; a timer only fires for its own generation.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for EmergencyOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyOverride")
            .field("state", &self.state())
            .field("ttl", &self.inner.ttl)
            .finish_non_exhaustive()
    }
}

impl EmergencyOverride {
    /// Creates an inactive override with the default 30 minute TTL.
    #[must_use]
    pub fn new(policy: Arc<PrivacyPolicyStore>) -> Self {
        Self::with_ttl(policy, DEFAULT_EMERGENCY_TTL)
    }

    /// Creates an inactive override with a custom TTL.
    #[must_use]
    pub fn with_ttl(policy: Arc<PrivacyPolicyStore>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                ttl,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    /// Activates the override, or restarts the countdown if already active.
    ///
    /// On first activation the current tier is saved and `Exact` is forced.
    /// Re-activation keeps the originally saved tier and activation time.
    ///
    /// # Errors
    ///
    /// Returns [`EmergencyError::NoRuntime`] when called outside a Tokio
    /// runtime. The state is left unchanged in that case.
    pub fn activate(&self) -> Result<EmergencyState> {
        let handle = Handle::try_current().map_err(|_| EmergencyError::NoRuntime)?;
        let mut control = self.inner.lock();

        if control.state.active {
            tracing::info!("Emergency override re-activated, restarting timer");
        } else {
            let prior = self.inner.policy.current().precision;
            self.inner.policy.set_precision(PrecisionTier::Exact);
            control.state = EmergencyState {
                active: true,
                activated_at: Some(Utc::now()),
                saved_prior_tier: Some(prior),
            };
            tracing::warn!(
                prior_tier = %prior,
                ttl_secs = self.inner.ttl.as_secs(),
                "Emergency override activated"
            );
        }

        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
        control.generation += 1;
        control.deadline = Some(Instant::now() + self.inner.ttl);

        let generation = control.generation;
        let ttl = self.inner.ttl;
        let weak = Arc::downgrade(&self.inner);
        control.timer = Some(handle.spawn(expire_after(weak, ttl, generation)));

        Ok(control.state)
    }

    /// Deactivates the override and restores the saved tier.
    ///
    /// Does nothing when already inactive.
    pub fn deactivate(&self) -> EmergencyState {
        let mut control = self.inner.lock();
        if !control.state.active {
            return control.state;
        }

        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
        self.inner.reset(&mut control);
        tracing::info!("Emergency override deactivated");
        control.state
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> EmergencyState {
        self.inner.lock().state
    }

    /// Whether the override is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Time left before automatic deactivation, or `None` when inactive.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .lock()
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self, control: &mut Control) {
        if let Some(prior) = control.state.saved_prior_tier {
            self.policy.set_precision(prior);
        }
        control.state = EmergencyState::default();
        control.deadline = None;
        control.generation += 1;
    }

    fn expire(&self, generation: u64) {
        let mut control = self.lock();
        if control.generation != generation || !control.state.active {
            tracing::debug!(generation, "Ignoring stale emergency timer");
            return;
        }
        // Detach our own handle; the task is finishing anyway.
        control.timer = None;
        self.reset(&mut control);
        tracing::info!("Emergency override expired");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = control.timer.take() {
            timer.abort();
        }
    }
}

async fn expire_after(inner: Weak<Inner>, ttl: Duration, generation: u64) {
    tokio::time::sleep(ttl).await;
    if let Some(inner) = inner.upgrade() {
        inner.expire(generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PrivacySettings;
    use crate::storage::MemoryKeyValueStore;

    fn policy(tier: PrecisionTier) -> Arc<PrivacyPolicyStore> {
        Arc::new(PrivacyPolicyStore::new(
            PrivacySettings::default().with_precision(tier),
            Arc::new(MemoryKeyValueStore::new()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn activate_forces_exact_and_saves_tier() {
        let policy = policy(PrecisionTier::AreaOnly);
        let emergency = EmergencyOverride::new(policy.clone());

        let state = emergency.activate().unwrap();

        assert!(state.active);
        assert!(state.activated_at.is_some());
        assert_eq!(state.saved_prior_tier, Some(PrecisionTier::AreaOnly));
        assert_eq!(policy.current().precision, PrecisionTier::Exact);
        assert_eq!(emergency.remaining(), Some(DEFAULT_EMERGENCY_TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_restores_tier() {
        let policy = policy(PrecisionTier::AreaOnly);
        let emergency = EmergencyOverride::new(policy.clone());
        emergency.activate().unwrap();

        let state = emergency.deactivate();

        assert_eq!(state, EmergencyState::default());
        assert_eq!(policy.current().precision, PrecisionTier::AreaOnly);
        assert_eq!(emergency.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivate_when_inactive_is_noop() {
        let policy = policy(PrecisionTier::Approximate);
        let emergency = EmergencyOverride::new(policy.clone());

        let state = emergency.deactivate();

        assert!(!state.active);
        assert_eq!(policy.current().precision, PrecisionTier::Approximate);
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_keeps_original_saved_tier() {
        let policy = policy(PrecisionTier::AreaOnly);
        let emergency = EmergencyOverride::new(policy.clone());
        let first = emergency.activate().unwrap();

        let second = emergency.activate().unwrap();

        assert_eq!(second.saved_prior_tier, Some(PrecisionTier::AreaOnly));
        assert_eq!(second.activated_at, first.activated_at);
        emergency.deactivate();
        assert_eq!(policy.current().precision, PrecisionTier::AreaOnly);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_ttl() {
        let policy = policy(PrecisionTier::Approximate);
        let emergency = EmergencyOverride::with_ttl(policy.clone(), Duration::from_secs(60));
        emergency.activate().unwrap();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(emergency.is_active());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!emergency.is_active());
        assert_eq!(policy.current().precision, PrecisionTier::Approximate);
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_restarts_countdown() {
        let policy = policy(PrecisionTier::Approximate);
        let emergency = EmergencyOverride::with_ttl(policy, Duration::from_secs(60));
        emergency.activate().unwrap();

        tokio::time::sleep(Duration::from_secs(40)).await;
        emergency.activate().unwrap();

        // The first timer would have fired at 60s.
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(emergency.is_active());

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(!emergency.is_active());
    }

    #[test]
    fn activate_without_runtime_fails() {
        let policy = policy(PrecisionTier::AreaOnly);
        let emergency = EmergencyOverride::new(policy.clone());

        assert_eq!(emergency.activate(), Err(EmergencyError::NoRuntime));
        assert!(!emergency.is_active());
        assert_eq!(policy.current().precision, PrecisionTier::AreaOnly);
    }
}
