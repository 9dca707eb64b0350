//! The single source of truth for PIN gating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{VaultError, VaultResult};
use super::pin::{validate_pin, PinHash};
use crate::config::KdfParams;

/// Whether a PIN is configured, its hash, and the current unlock deadline.
///
/// `configured` is derived from the presence of the hash, so the two can
/// never disagree. The unlock deadline is session state and is skipped when
/// persisting; a freshly loaded state is always locked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityState {
    #[serde(default)]
    pin_hash: Option<PinHash>,
    #[serde(skip)]
    unlocked_until: Option<DateTime<Utc>>,
}

impl SecurityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.pin_hash.is_some()
    }

    /// Hash and store a new PIN.
    ///
    /// # Errors
    /// `AlreadyConfigured` if a PIN is set (reset first), `InvalidPinFormat`
    /// if the PIN is not 4-8 digits, `KeyDerivation` if `params` are rejected.
    pub fn configure(&mut self, pin: &str, params: KdfParams) -> VaultResult<()> {
        if self.is_configured() {
            return Err(VaultError::AlreadyConfigured);
        }
        validate_pin(pin)?;

        self.pin_hash = Some(PinHash::create(pin, params)?);
        self.unlocked_until = None;
        debug!("PIN hash stored");
        Ok(())
    }

    /// Compare `pin` against the stored hash. Never errors.
    pub fn verify(&self, pin: &str) -> bool {
        self.pin_hash.as_ref().is_some_and(|hash| hash.verify(pin))
    }

    /// Whether both states hold the same PIN hash (or both hold none).
    ///
    /// Hashes are told apart by their salt, which is fresh for every
    /// configured PIN.
    pub(crate) fn same_pin(&self, other: &SecurityState) -> bool {
        match (&self.pin_hash, &other.pin_hash) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_salt(b),
            _ => false,
        }
    }

    /// Return to the initial empty state. Idempotent.
    pub fn clear(&mut self) {
        // PinHash zeroizes on drop
        self.pin_hash = None;
        self.unlocked_until = None;
    }

    /// End of the current unlock session, if any.
    ///
    /// Always `None` when no PIN is configured.
    pub fn unlocked_until(&self) -> Option<DateTime<Utc>> {
        self.unlocked_until.filter(|_| self.is_configured())
    }

    pub(crate) fn set_unlocked_until(&mut self, deadline: Option<DateTime<Utc>>) {
        self.unlocked_until = deadline;
    }
}
