//! Configuration for UserSig issuers and verifiers.
//!
//! Configuration is loaded from a YAML file such as:
//!
//! ```yaml
//! sdk_app_id: 1400000000
//! key_env: USERSIG_KEY
//! key_file: /etc/usersig/key
//! compression_level: 0
//! pool_capacity: 16
//! default_expire_seconds: 15552000
//! ```
//!
//! The shared key itself never lives in the file; it is resolved from the
//! named environment variable first and the key file second.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::key::SecretKey;

/// Highest zlib compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Default compression level (0: stored, no compression).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 0;

/// Default number of idle compressors kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// UserSig configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSigConfig {
    /// Application ID (`sdkappid`) tokens are issued for and checked against.
    pub sdk_app_id: u64,

    /// Environment variable containing the shared key.
    #[serde(default)]
    pub key_env: Option<String>,

    /// Path to a file containing the shared key.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// zlib level used when packing tokens (0 = stored, 9 = best).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Maximum number of idle compressors kept for reuse.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Token lifetime used when the caller does not pick one, in seconds.
    #[serde(default = "default_expire_seconds")]
    pub default_expire_seconds: i64,
}

impl UserSigConfig {
    /// Create a configuration with defaults for everything but the app id.
    pub fn new(sdk_app_id: u64) -> Self {
        Self {
            sdk_app_id,
            key_env: None,
            key_file: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            default_expire_seconds: default_expire_seconds(),
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content and validate it.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(ConfigError::Config(format!(
                "compression_level must be between 0 and {MAX_COMPRESSION_LEVEL}, got {}",
                self.compression_level
            )));
        }
        if self.pool_capacity == 0 {
            return Err(ConfigError::Config(
                "pool_capacity must be at least 1".to_string(),
            ));
        }
        if self.default_expire_seconds <= 0 {
            return Err(ConfigError::Config(format!(
                "default_expire_seconds must be positive, got {}",
                self.default_expire_seconds
            )));
        }
        Ok(())
    }

    /// Resolve the shared key from environment or file.
    pub fn resolve_key(&self) -> Result<Option<SecretKey>, ConfigError> {
        // Try environment variable first
        if let Some(env_var) = &self.key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Ok(Some(SecretKey::from(key)));
            }
        }

        if let Some(path) = &self.key_file {
            if path.exists() {
                let key = fs::read_to_string(path)?;
                return Ok(Some(SecretKey::from(key.trim())));
            }
        }

        Ok(None)
    }

    /// Resolve the shared key, failing when no source provides one.
    pub fn require_key(&self) -> Result<SecretKey, ConfigError> {
        match self.resolve_key()? {
            Some(key) if !key.is_empty() => Ok(key),
            Some(_) => Err(ConfigError::Config("shared key is empty".to_string())),
            None => Err(ConfigError::Config(
                "no shared key found: set key_env or key_file".to_string(),
            )),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_pool_capacity() -> usize {
    DEFAULT_POOL_CAPACITY
}

fn default_expire_seconds() -> i64 {
    86400 * 180
}
