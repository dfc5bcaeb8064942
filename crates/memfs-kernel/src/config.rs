//! Filesystem configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a usable configuration:
//!
//! ```toml
//! capacity = 1048576     # bytes available for file contents
//! max_open_files = 16    # descriptors per session
//! max_name_len = 255     # bytes per path component
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default capacity: 1 MiB.
pub const DEFAULT_CAPACITY: u64 = 1024 * 1024;

/// Default descriptor table size per session.
pub const DEFAULT_MAX_OPEN_FILES: usize = 16;

/// Default maximum length of one path component.
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The TOML did not parse.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Tunables for one [`FileSystem`](crate::FileSystem) instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Bytes available for file contents.
    pub capacity: u64,
    /// Descriptors a single session may hold at once.
    pub max_open_files: usize,
    /// Maximum length in bytes of a single path component.
    pub max_name_len: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl FsConfig {
    /// Set the capacity.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the per-session descriptor limit.
    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files;
        self
    }

    /// Set the path component length limit.
    pub fn with_max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), capacity = config.capacity, "loaded config");
        Ok(config)
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_files == 0 {
            return Err(ConfigError::Invalid {
                field: "max_open_files",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_open_files > i32::MAX as usize {
            return Err(ConfigError::Invalid {
                field: "max_open_files",
                reason: format!("must be at most {}", i32::MAX),
            });
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid {
                field: "max_name_len",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.capacity > i64::MAX as u64 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: format!("must be at most {}", i64::MAX),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FsConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.max_open_files, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FsConfig::from_toml_str("capacity = 4096\n").unwrap();
        assert_eq!(config.capacity, 4096);
        assert_eq!(config.max_open_files, DEFAULT_MAX_OPEN_FILES);
        assert_eq!(config.max_name_len, DEFAULT_MAX_NAME_LEN);
    }

    #[test]
    fn test_empty_toml() {
        assert_eq!(FsConfig::from_toml_str("").unwrap(), FsConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let err = FsConfig::from_toml_str("max_open_files = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_open_files",
                ..
            }
        ));

        let err = FsConfig::from_toml_str("capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "capacity = 100\nmax_open_files = 4").unwrap();

        let config = FsConfig::load(file.path()).unwrap();
        assert_eq!(config, FsConfig::default().with_capacity(100).with_max_open_files(4));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
