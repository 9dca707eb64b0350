mod file;
mod memory;

pub use file::FileVaultStore;
pub use memory::MemoryVaultStore;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::vault::{SecurityState, VaultCategory};

/// Storage collaborator behind the vault.
///
/// The core knows nothing about record shapes; it only needs to wipe a
/// category and to load/save the [`SecurityState`].
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Remove every record in `category`. Clearing an empty category succeeds.
    async fn clear(&self, category: VaultCategory) -> StorageResult<()>;

    /// Returns `None` on first run, when nothing has been saved yet.
    async fn load_security_state(&self) -> StorageResult<Option<SecurityState>>;

    async fn save_security_state(&self, state: &SecurityState) -> StorageResult<()>;
}
