use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::VaultStore;
use crate::error::StorageResult;
use crate::vault::{SecurityState, VaultCategory};

/// In-process store. Records are opaque JSON values.
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    records: RwLock<HashMap<VaultCategory, Vec<Value>>>,
    security: RwLock<Option<SecurityState>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, category: VaultCategory, record: Value) {
        let mut records = self.records.write().await;
        records.entry(category).or_default().push(record);
    }

    pub async fn len(&self, category: VaultCategory) -> usize {
        let records = self.records.read().await;
        records.get(&category).map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, category: VaultCategory) -> bool {
        self.len(category).await == 0
    }
}

#[async_trait]
impl VaultStore for MemoryVaultStore {
    async fn clear(&self, category: VaultCategory) -> StorageResult<()> {
        let removed = self
            .records
            .write()
            .await
            .remove(&category)
            .map_or(0, |r| r.len());
        debug!("Cleared {} {} records from memory", removed, category);
        Ok(())
    }

    async fn load_security_state(&self) -> StorageResult<Option<SecurityState>> {
        Ok(self.security.read().await.clone())
    }

    async fn save_security_state(&self, state: &SecurityState) -> StorageResult<()> {
        *self.security.write().await = Some(state.clone());
        Ok(())
    }
}
