//! JSON file store.
//!
//! Layout inside the data directory:
//! - `<category>.json`: JSON array of that category's records
//! - `security.json`: the persisted [`SecurityState`]
//!
//! Every write goes to a temp file first and is then renamed into place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::VaultStore;
use crate::error::{StorageError, StorageResult};
use crate::vault::{SecurityState, VaultCategory};

/// File name for the persisted security state.
const SECURITY_FILE: &str = "security.json";

#[derive(Debug)]
pub struct FileVaultStore {
    data_dir: PathBuf,
    // Serializes read-modify-write cycles on category files
    write_lock: Mutex<()>,
}

impl FileVaultStore {
    /// Use `data_dir` for storage, creating it if needed.
    pub async fn open(data_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Using vault data directory {:?}", data_dir);
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn category_path(&self, category: VaultCategory) -> PathBuf {
        self.data_dir.join(format!("{}.json", category))
    }

    fn security_path(&self) -> PathBuf {
        self.data_dir.join(SECURITY_FILE)
    }

    /// Append a record to a category file.
    pub async fn insert(&self, category: VaultCategory, record: Value) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.category_path(category);

        let mut records = read_records(&path).await?;
        records.push(record);
        write_atomic(&path, &serde_json::to_vec_pretty(&records)?).await?;

        debug!("Stored {} {} records", records.len(), category);
        Ok(())
    }

    pub async fn len(&self, category: VaultCategory) -> StorageResult<usize> {
        Ok(read_records(&self.category_path(category)).await?.len())
    }

    pub async fn is_empty(&self, category: VaultCategory) -> StorageResult<bool> {
        Ok(self.len(category).await? == 0)
    }
}

#[async_trait]
impl VaultStore for FileVaultStore {
    async fn clear(&self, category: VaultCategory) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.category_path(category);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_security_state(&self) -> StorageResult<Option<SecurityState>> {
        let path = self.security_path();

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_slice(&content).map_err(|e| {
            StorageError::Corrupted(format!("Failed to parse {}: {}", SECURITY_FILE, e))
        })?;
        Ok(Some(state))
    }

    async fn save_security_state(&self, state: &SecurityState) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(state)?;
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.security_path(), &content).await
    }
}

async fn read_records(path: &Path) -> StorageResult<Vec<Value>> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&content)
        .map_err(|e| StorageError::Corrupted(format!("Failed to parse {:?}: {}", path, e)))
}

/// Write to a private temp file, then rename into place.
///
/// On Unix the temp file is created with mode 0600, so the content is never
/// readable by others, not even briefly.
async fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    let temp_path = path.with_extension("json.tmp");

    // A leftover from a crashed write may carry looser permissions
    match tokio::fs::remove_file(&temp_path).await {
        Ok(()) => debug!("Removed stale {:?}", temp_path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&temp_path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}
