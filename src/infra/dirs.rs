//! Per-user directory management
//!
//! Provides the cache and config locations, following the XDG Base Directory
//! layout through the `dirs` crate.
//!
//! Environment variables can override default directories:
//! - `ABCROSS_CACHE_DIR` - Override the tarball cache directory
//! - `ABCROSS_CONFIG_DIR` - Override the config directory

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "ABCROSS_CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "ABCROSS_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "abcross";

const CONFIG_FILE: &str = "config.toml";

/// Per-user directories used by abcross
#[derive(Debug, Clone)]
pub struct AbcrossDirs {
    cache_dir: PathBuf,
    config_dir: PathBuf,
}

impl AbcrossDirs {
    /// Resolve directories from the environment, then platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: resolve(ENV_CACHE_DIR, dirs::cache_dir, ".cache"),
            config_dir: resolve(ENV_CONFIG_DIR, dirs::config_dir, ".config"),
        }
    }

    /// Directories rooted at explicit locations
    #[must_use]
    pub fn with_dirs(cache_dir: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            config_dir: config_dir.into(),
        }
    }

    /// Persistent tarball cache
    ///
    /// - Linux: `$XDG_CACHE_HOME/abcross` or `~/.cache/abcross`
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Config directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of `config.toml` in the config directory
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

impl Default for AbcrossDirs {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(var: &str, platform: fn() -> Option<PathBuf>, home_fallback: &str) -> PathBuf {
    if let Some(path) = env::var_os(var).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    platform().map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_fallback)
            .join(APP_NAME)
    })
}
