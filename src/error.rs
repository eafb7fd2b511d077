//! Error types for abcross
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Architecture and variant catalog errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchError {
    /// Identifier is not one of the supported architectures
    #[error("Invalid architecture '{name}' (supported: {supported})")]
    InvalidArchitecture { name: String, supported: String },

    /// Label is not one of the known distribution variants
    #[error("Invalid variant '{name}' (supported: {supported})")]
    InvalidVariant { name: String, supported: String },
}

/// Release manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Mirror URL does not parse or uses an unsupported scheme
    #[error("Invalid mirror URL '{url}': {reason}")]
    InvalidMirrorUrl { url: String, reason: String },

    /// Manifest could not be retrieved
    #[error("Network error fetching manifest '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Manifest is not the document we expect
    #[error("Malformed manifest: {message}")]
    Malformed { message: String },
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Downloaded bytes do not hash to the published digest
    #[error("Downloaded file '{file}' has wrong checksum\nExpected: {expected}\nGot:      {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// Tarball path cannot be turned into a download URL
    #[error("Invalid download URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Local filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to list directory
    #[error("Failed to read directory '{path}': {error}")]
    ReadDir { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// External process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Program could not be started at all
    #[error("Failed to execute '{program}': {error}. Is it installed?")]
    Spawn { program: String, error: String },

    /// Reading the output pipes or waiting for the child failed
    #[error("IO error while running '{program}': {error}")]
    Io { program: String, error: String },
}

/// Tarball extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Tarball or destination precondition not met
    #[error("Invalid extraction input: {message}")]
    InvalidInput { message: String },

    /// Archiver exited with a non-zero status
    #[error("tar returned non-zero exit status {code}: {stderr}")]
    ExtractionFailed { code: i32, stderr: String },

    /// Archiver could not be run
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Errors raised by operations on an existing sysroot
#[derive(Error, Debug)]
pub enum SysrootError {
    /// Neither native execution nor binfmt emulation is available
    #[error("Can't run programs built for {arch}. Install {emulator} first")]
    CannotExecute { arch: String, emulator: String },

    /// Sysroot lacks the package database
    #[error("Package database not found at '{path}'. Is this a deployed sysroot?")]
    EnvironmentError { path: PathBuf },

    /// Package metadata refresh failed (strict refresh only)
    #[error("Refreshing package metadata failed with exit status {code}")]
    RefreshFailed { code: i32 },

    /// Full upgrade failed
    #[error("Full upgrade failed with exit status {code}")]
    UpgradeFailed { code: i32 },

    /// Package download failed
    #[error("Downloading packages failed with exit status {code}")]
    DownloadFailed { code: i32 },

    /// Force-unpacking failed
    #[error("Unpacking packages failed with exit status {code}")]
    UnpackFailed { code: i32 },

    /// Removing the temporary download directory failed
    #[error("Removing '{path}' failed with exit status {code}")]
    CleanupFailed { path: PathBuf, code: i32 },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Process could not be run
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Deployment pipeline errors
#[derive(Error, Debug)]
pub enum DeployError {
    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extraction error
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Escalated filesystem operation exited non-zero
    #[error("Privileged operation '{operation}' on '{path}' failed with exit status {code}")]
    PrivilegedOperationFailed {
        operation: String,
        path: PathBuf,
        code: i32,
    },

    /// Process could not be run
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

impl DeployError {
    /// Process exit status for this failure
    ///
    /// Privileged filesystem failures (directory creation/removal and the
    /// escalated archiver) exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::PrivilegedOperationFailed { .. }
            | DeployError::Extract(ExtractError::ExtractionFailed { .. }) => 2,
            _ => 1,
        }
    }
}

/// Top-level abcross error type
#[derive(Error, Debug)]
pub enum AbcrossError {
    /// Catalog error
    #[error(transparent)]
    Arch(#[from] ArchError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extraction error
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Deployment error
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Sysroot operation error
    #[error(transparent)]
    Sysroot(#[from] SysrootError),

    /// Process error
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] crate::core::config::ConfigError),
}

impl AbcrossError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            AbcrossError::Deploy(e) => e.exit_code(),
            AbcrossError::Extract(ExtractError::ExtractionFailed { .. }) => 2,
            _ => 1,
        }
    }
}
