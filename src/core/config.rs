//! User configuration
//!
//! Optional settings read from `config.toml` in the config directory. Every
//! key may be omitted; command-line flags take precedence over the file and
//! the file over built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{defaults, urls};
use crate::core::arch::Variant;
use crate::error::ArchError;
use crate::infra::dirs::AbcrossDirs;
use crate::infra::filesystem;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Settings from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcrossConfig {
    /// Mirror root URL
    pub mirror: Option<String>,

    /// Default variant label or alias for `deploy`
    pub variant: Option<String>,

    /// Base directory of the standard sysroots
    pub sysroot_base: Option<PathBuf>,

    /// Persistent tarball cache
    pub cache_dir: Option<PathBuf>,

    /// Privilege escalation program; empty runs privileged commands directly
    pub escalation: Option<String>,

    /// binfmt_misc registration directory
    pub binfmt_dir: Option<PathBuf>,
}

impl AbcrossConfig {
    /// Load configuration from the config directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the config file exists but
    /// contains invalid TOML.
    pub fn load(dirs: &AbcrossDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.config_path())
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = filesystem::read_file(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Effective mirror URL
    #[must_use]
    pub fn mirror(&self) -> &str {
        self.mirror.as_deref().unwrap_or(urls::DEFAULT_MIRROR)
    }

    /// Effective default variant
    pub fn variant(&self) -> Result<Variant, ArchError> {
        self.variant
            .as_deref()
            .unwrap_or(defaults::DEFAULT_VARIANT)
            .parse()
    }

    /// Effective sysroot base directory
    #[must_use]
    pub fn sysroot_base(&self) -> PathBuf {
        self.sysroot_base
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::SYSROOT_BASE))
    }

    /// Effective persistent cache directory
    #[must_use]
    pub fn cache_dir(&self, dirs: &AbcrossDirs) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| dirs.cache_dir().to_path_buf())
    }

    /// Effective escalation program, `None` when disabled
    #[must_use]
    pub fn escalation(&self) -> Option<&str> {
        match self.escalation.as_deref() {
            None => Some(defaults::ESCALATION_PROGRAM),
            Some("") => None,
            Some(program) => Some(program),
        }
    }

    /// Effective binfmt_misc directory
    #[must_use]
    pub fn binfmt_dir(&self) -> PathBuf {
        self.binfmt_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::BINFMT_DIR))
    }
}
