//! Vault-specific error types for gating and reset operations.
//!
//! This module provides granular error handling for vault operations,
//! allowing the presentation layer to display appropriate messages
//! and take corrective actions.

use std::collections::BTreeSet;

use thiserror::Error;

use super::auth::VaultCategory;
use crate::error::{ConfigError, StorageError};

/// Errors that can occur during vault operations.
///
/// These errors are designed to be:
/// - Specific enough for programmatic handling
/// - User-friendly for display in the UI
/// - Scoped to the single operation that raised them
#[derive(Error, Debug)]
pub enum VaultError {
    /// A PIN is already set.
    /// User must reset the vault before choosing a new one.
    #[error("PIN already configured")]
    AlreadyConfigured,

    /// The provided PIN is incorrect.
    /// User should try again or use the reset option.
    #[error("Wrong PIN")]
    WrongPin,

    /// No PIN has been set up yet.
    #[error("PIN not configured")]
    NotConfigured,

    /// The PIN does not meet the format rules.
    #[error("Invalid PIN format: {0}")]
    InvalidPinFormat(String),

    /// Another reset is still running.
    #[error("Reset already in progress")]
    ResetInProgress,

    /// Some categories could not be cleared.
    /// Retry with exactly the categories in `partial`.
    #[error("Reset incomplete, categories not cleared: {}", format_categories(.partial))]
    ResetFailure { partial: BTreeSet<VaultCategory> },

    /// Key derivation failed (Argon2 error).
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// The vault was opened with an invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error reported by the storage collaborator, passed through as-is.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

fn format_categories(categories: &BTreeSet<VaultCategory>) -> String {
    categories
        .iter()
        .map(VaultCategory::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl VaultError {
    /// Stable error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::AlreadyConfigured => "ALREADY_CONFIGURED",
            VaultError::WrongPin => "WRONG_PIN",
            VaultError::NotConfigured => "NOT_CONFIGURED",
            VaultError::InvalidPinFormat(_) => "INVALID_PIN_FORMAT",
            VaultError::ResetInProgress => "RESET_IN_PROGRESS",
            VaultError::ResetFailure { .. } => "RESET_FAILURE",
            VaultError::KeyDerivation(_) => "KEY_DERIVATION_ERROR",
            VaultError::Config(_) => "CONFIG_ERROR",
            VaultError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

// ============================================================================
// Serialization for the UI boundary
// ============================================================================

impl serde::Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let field_count = if matches!(self, VaultError::ResetFailure { .. }) {
            3
        } else {
            2
        };
        let mut state = serializer.serialize_struct("VaultError", field_count)?;

        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        // The caller retries exactly these
        if let VaultError::ResetFailure { partial } = self {
            state.serialize_field("partial", partial)?;
        }
        state.end()
    }
}
