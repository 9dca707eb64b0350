//! PIN gating and destructive reset.
//!
//! This module provides:
//! - `SecurityState`: whether a PIN is configured, its Argon2id hash and the
//!   current unlock deadline
//! - `PinGate`: turns that state into a `GateDecision` for the UI
//! - `ResetCoordinator`: wipes every data category, then the security state
//!
//! The PIN is never stored; only its salted Argon2id hash.

pub mod auth;
pub mod error;
pub mod gate;
pub mod pin;
pub mod reset;
pub mod state;

pub use auth::{GateDecision, VaultCategory};
pub use error::{VaultError, VaultResult};
pub use gate::{
    Clock, FailedAttempt, FailedAttemptHook, NoOpFailedAttemptHook, PinGate, SystemClock,
};
pub use pin::PinHash;
pub use reset::{ResetCoordinator, ResetOperation, ResetStatus};
pub use state::SecurityState;
