//! PinGate - decides what a protected view may render.
//!
//! The gate owns no state of its own beyond a failed-attempt counter. It
//! reads and updates the unlock deadline held in [`SecurityState`], using an
//! injectable [`Clock`] so that session expiry is testable.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::auth::GateDecision;
use super::error::{VaultError, VaultResult};
use super::state::SecurityState;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Details of a rejected unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    /// Wrong PINs in a row, including this one.
    pub consecutive_failures: u32,
    pub at: DateTime<Utc>,
}

/// Extension point for rate limiting or auditing wrong PIN entries.
///
/// Called synchronously after every `WrongPin`, before the error is
/// returned to the caller.
pub trait FailedAttemptHook: Send + Sync {
    fn on_failed_attempt(&self, attempt: &FailedAttempt);
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpFailedAttemptHook;

impl FailedAttemptHook for NoOpFailedAttemptHook {
    fn on_failed_attempt(&self, _attempt: &FailedAttempt) {}
}

pub struct PinGate {
    session_ttl: Duration,
    clock: Arc<dyn Clock>,
    hook: Arc<dyn FailedAttemptHook>,
    consecutive_failures: AtomicU32,
}

impl PinGate {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            session_ttl,
            clock: Arc::new(SystemClock),
            hook: Arc::new(NoOpFailedAttemptHook),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_failed_attempt_hook(mut self, hook: Arc<dyn FailedAttemptHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Decide between setup prompt, unlock prompt and protected content.
    pub fn evaluate(&self, state: &SecurityState) -> GateDecision {
        if !state.is_configured() {
            return GateDecision::NeedsSetup;
        }

        match state.unlocked_until() {
            Some(deadline) if self.clock.now() < deadline => GateDecision::Open,
            _ => GateDecision::NeedsUnlock,
        }
    }

    /// Start an unlock session if `pin` matches.
    ///
    /// On a wrong PIN the state is left untouched and the failed-attempt
    /// hook fires.
    pub fn unlock(&self, state: &mut SecurityState, pin: &str) -> VaultResult<()> {
        let verified = state.verify(pin);
        self.apply_verification(state, verified)
    }

    /// Second half of [`unlock`](Self::unlock), for callers that checked the
    /// PIN themselves against the hash currently in `state`.
    pub(crate) fn apply_verification(
        &self,
        state: &mut SecurityState,
        verified: bool,
    ) -> VaultResult<()> {
        if !state.is_configured() {
            return Err(VaultError::NotConfigured);
        }

        if !verified {
            let attempt = FailedAttempt {
                consecutive_failures: self
                    .consecutive_failures
                    .fetch_add(1, Ordering::SeqCst)
                    .saturating_add(1),
                at: self.clock.now(),
            };
            warn!(
                "Unlock rejected: wrong PIN ({} consecutive failures)",
                attempt.consecutive_failures
            );
            self.hook.on_failed_attempt(&attempt);
            return Err(VaultError::WrongPin);
        }

        let now = self.clock.now();
        let deadline = now
            .checked_add_signed(self.session_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        state.set_unlocked_until(Some(deadline));
        self.consecutive_failures.store(0, Ordering::SeqCst);

        info!("Vault unlocked until {}", deadline);
        Ok(())
    }

    /// End the unlock session immediately. Idempotent.
    pub fn lock(&self, state: &mut SecurityState) {
        if state.unlocked_until().is_some() {
            info!("Vault locked");
        }
        state.set_unlocked_until(None);
    }

    /// Forget past failures, e.g. after the vault is wiped.
    pub fn reset_failures(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        debug!("Failed attempt counter reset");
    }
}
