use thiserror::Error;

/// Errors raised by a [`VaultStore`](crate::storage::VaultStore) backend.
///
/// The vault core never interprets these; they are carried unchanged inside
/// [`VaultError::Storage`](crate::vault::VaultError::Storage).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored data is corrupted: {0}")]
    Corrupted(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
