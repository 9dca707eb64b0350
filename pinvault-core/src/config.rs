use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Default unlock session length (15 minutes).
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 900;

/// Argon2id parameters used when hashing a new PIN.
///
/// The defaults balance security and usability:
/// - Memory: 64 MB (strong resistance to GPU attacks)
/// - Time: 3 iterations
/// - Parallelism: 4 lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB in KiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VaultConfig {
    /// How long a successful unlock keeps protected views open.
    pub session_ttl_seconds: u64,
    pub kdf: KdfParams,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            kdf: KdfParams::default(),
        }
    }
}

impl VaultConfig {
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        i64::try_from(self.session_ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.session_ttl_seconds == 0 {
            return Err(ConfigError::Invalid(
                "sessionTtlSeconds must be greater than zero".into(),
            ));
        }
        // chrono::Duration caps out well below i64::MAX seconds
        if i64::try_from(self.session_ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .is_none()
        {
            return Err(ConfigError::Invalid("sessionTtlSeconds is too large".into()));
        }
        if self.kdf.iterations == 0 || self.kdf.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "kdf iterations and parallelism must be greater than zero".into(),
            ));
        }
        let min_memory = self.kdf.parallelism.saturating_mul(8);
        if self.kdf.memory_kib < min_memory {
            return Err(ConfigError::Invalid(format!(
                "kdf memoryKib must be at least {} for {} lanes",
                min_memory, self.kdf.parallelism
            )));
        }
        Ok(())
    }
}

/// Load the vault configuration from a JSON file.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> ConfigResult<VaultConfig> {
    if !path.exists() {
        return Ok(VaultConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: VaultConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &VaultConfig) -> ConfigResult<()> {
    config.validate()?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
