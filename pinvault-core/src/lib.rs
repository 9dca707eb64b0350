//! PIN-gated access control and destructive reset for a personal data vault.
//!
//! Presentation components talk only to [`VaultFacade`]. It reports which
//! render path a protected view should take ([`GateDecision`]), manages the
//! PIN and the unlock session, and wipes every [`VaultCategory`] on request.
//! Record storage lives behind the [`VaultStore`] trait.

pub mod config;
pub mod error;
pub mod facade;
pub mod storage;
pub mod vault;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::{load_config, save_config, KdfParams, VaultConfig};
pub use error::{ConfigError, StorageError};
pub use facade::VaultFacade;
pub use storage::{FileVaultStore, MemoryVaultStore, VaultStore};
pub use vault::{GateDecision, VaultCategory, VaultError, VaultResult};

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to debug output for this crate. Calling
/// it again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinvault_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
