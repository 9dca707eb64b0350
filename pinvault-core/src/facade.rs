//! VaultFacade - the only surface the presentation layer talks to.
//!
//! Each method maps onto one UI callback:
//! - `is_pin_configured` backs `hasPinConfigured`
//! - `set_pin` / `unlock` back `onOpenPinDialog`
//! - `reset_all` backs `onResetData`
//! - `status` picks the render path of a protected view

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::storage::VaultStore;
use crate::vault::{
    Clock, FailedAttemptHook, GateDecision, PinGate, ResetCoordinator, SecurityState,
    VaultCategory, VaultError, VaultResult,
};

/// Session-scoped owner of the security state.
///
/// Safe to share between concurrent UI event handlers (wrap in an `Arc`).
/// Writers (`set_pin`, `unlock`, `lock`, reset) are serialized on one
/// `RwLock`; readers always see a consistent snapshot. Argon2id runs on the
/// blocking pool with no lock held, so `status` never waits on a PIN hash.
///
/// `set_pin` and `unlock` are refused with `ResetInProgress` while a reset is
/// pending.
pub struct VaultFacade {
    security: RwLock<SecurityState>,
    gate: PinGate,
    reset: ResetCoordinator,
    store: Arc<dyn VaultStore>,
    config: VaultConfig,
}

impl VaultFacade {
    /// Start a session, loading any persisted security state.
    ///
    /// A previously configured vault always opens locked.
    pub async fn open(store: Arc<dyn VaultStore>, config: VaultConfig) -> VaultResult<Self> {
        config.validate()?;

        let security = store.load_security_state().await?.unwrap_or_default();
        info!(
            "Vault session started (PIN configured: {})",
            security.is_configured()
        );

        Ok(Self {
            security: RwLock::new(security),
            gate: PinGate::new(config.session_ttl()),
            reset: ResetCoordinator::new(),
            store,
            config,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.gate = self.gate.with_clock(clock);
        self
    }

    pub fn with_failed_attempt_hook(mut self, hook: Arc<dyn FailedAttemptHook>) -> Self {
        self.gate = self.gate.with_failed_attempt_hook(hook);
        self
    }

    pub async fn is_pin_configured(&self) -> bool {
        self.security.read().await.is_configured()
    }

    /// Which of the three render paths a protected view should take.
    pub async fn status(&self) -> GateDecision {
        let security = self.security.read().await;
        self.gate.evaluate(&security)
    }

    /// Configure the PIN on an unconfigured vault.
    ///
    /// The new state is persisted before it becomes visible, so a failed
    /// save leaves the vault unconfigured. Does not unlock the session.
    pub async fn set_pin(&self, pin: &str) -> VaultResult<()> {
        self.ensure_no_reset()?;

        let current = self.security.read().await.clone();
        if current.is_configured() {
            return Err(VaultError::AlreadyConfigured);
        }

        let pin = Zeroizing::new(pin.to_owned());
        let kdf = self.config.kdf;
        let next = run_blocking(move || {
            let mut next = current;
            next.configure(&pin, kdf).map(|()| next)
        })
        .await??;

        let mut security = self.security.write().await;
        self.ensure_no_reset()?;
        if security.is_configured() {
            // Another set_pin won the race while we were hashing
            return Err(VaultError::AlreadyConfigured);
        }
        self.store.save_security_state(&next).await?;
        *security = next;

        info!("PIN configured");
        Ok(())
    }

    /// Open an unlock session if `pin` matches the configured PIN.
    pub async fn unlock(&self, pin: &str) -> VaultResult<()> {
        self.ensure_no_reset()?;

        loop {
            let snapshot = self.security.read().await.clone();
            let verified = if snapshot.is_configured() {
                let pin = Zeroizing::new(pin.to_owned());
                let candidate = snapshot.clone();
                run_blocking(move || candidate.verify(&pin)).await?
            } else {
                false
            };

            let mut security = self.security.write().await;
            self.ensure_no_reset()?;
            if !security.same_pin(&snapshot) {
                debug!("PIN changed while verifying, checking again");
                continue;
            }
            return self.gate.apply_verification(&mut security, verified);
        }
    }

    pub async fn lock(&self) {
        let mut security = self.security.write().await;
        self.gate.lock(&mut security);
    }

    pub fn is_reset_in_progress(&self) -> bool {
        self.reset.is_in_progress()
    }

    /// Irreversibly wipe every category and the PIN.
    pub async fn reset_all(&self) -> VaultResult<()> {
        warn!("Reset of all vault data requested");
        let result = self.reset.reset_all(self.store.as_ref(), &self.security).await;
        if result.is_ok() {
            self.gate.reset_failures();
        }
        result
    }

    /// Retry a failed reset.
    ///
    /// `partial` is widened to whatever the last failed reset left behind; with
    /// no failure on record this wipes every category, like `reset_all`.
    pub async fn retry_reset(&self, partial: BTreeSet<VaultCategory>) -> VaultResult<()> {
        warn!("Retrying reset of {} categories", partial.len());
        let result = self
            .reset
            .reset(self.store.as_ref(), &self.security, partial)
            .await;
        if result.is_ok() {
            self.gate.reset_failures();
        }
        result
    }

    fn ensure_no_reset(&self) -> VaultResult<()> {
        if self.reset.is_in_progress() {
            debug!("Refusing PIN operation while a reset is pending");
            return Err(VaultError::ResetInProgress);
        }
        Ok(())
    }
}

/// Run CPU-heavy PIN hashing on the blocking pool.
async fn run_blocking<T, F>(task: F) -> VaultResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| VaultError::KeyDerivation(format!("PIN hashing task failed: {}", e)))
}
