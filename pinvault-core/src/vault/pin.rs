//! PIN hashing with Argon2id.
//!
//! Every configured PIN gets its own random 16-byte salt. The PIN itself is
//! never stored; only the Argon2id output, the salt and the parameters used
//! to produce it.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::error::{VaultError, VaultResult};
use crate::config::KdfParams;

/// Salt size in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Hash output length in bytes (256 bits)
pub const HASH_SIZE: usize = 32;

pub const PIN_MIN_LEN: usize = 4;
pub const PIN_MAX_LEN: usize = 8;

/// Check that a PIN is 4-8 ASCII digits.
pub fn validate_pin(pin: &str) -> VaultResult<()> {
    let digits_only = pin.chars().all(|c| c.is_ascii_digit());
    if pin.len() < PIN_MIN_LEN || pin.len() > PIN_MAX_LEN || !digits_only {
        return Err(VaultError::InvalidPinFormat(format!(
            "PIN must be {}-{} digits",
            PIN_MIN_LEN, PIN_MAX_LEN
        )));
    }
    Ok(())
}

/// Generate a fresh cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Verified PIN hash with automatic zeroization on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PinHash {
    #[serde(with = "hex")]
    salt: [u8; SALT_SIZE],
    #[serde(with = "hex")]
    hash: [u8; HASH_SIZE],
    #[zeroize(skip)]
    params: KdfParams,
}

impl PinHash {
    /// Hash a PIN under a new random salt.
    pub fn create(pin: &str, params: KdfParams) -> VaultResult<Self> {
        let salt = generate_salt();
        let hash = derive(pin, &salt, &params)?;
        Ok(Self {
            salt,
            hash: *hash,
            params,
        })
    }

    /// Constant-time check of `pin` against this hash.
    ///
    /// A derivation failure counts as a mismatch.
    pub fn verify(&self, pin: &str) -> bool {
        match derive(pin, &self.salt, &self.params) {
            Ok(candidate) => candidate.as_slice().ct_eq(self.hash.as_slice()).into(),
            Err(e) => {
                debug!("PIN verification could not derive key: {}", e);
                false
            }
        }
    }

    /// True when both hashes came from the same `create` call.
    pub(crate) fn same_salt(&self, other: &PinHash) -> bool {
        self.salt.as_slice().ct_eq(other.salt.as_slice()).into()
    }
}

impl std::fmt::Debug for PinHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual hash material
        f.debug_struct("PinHash")
            .field("salt", &"[REDACTED]")
            .field("hash", &"[REDACTED]")
            .field("params", &self.params)
            .finish()
    }
}

/// Run Argon2id over the PIN. Intentionally slow.
fn derive(
    pin: &str,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> VaultResult<Zeroizing<[u8; HASH_SIZE]>> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(HASH_SIZE),
    )
    .map_err(|e| VaultError::KeyDerivation(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut out = Zeroizing::new([0u8; HASH_SIZE]);
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut out[..])
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    Ok(out)
}
