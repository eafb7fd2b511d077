//! Sysroot deployment
//!
//! Resolves the latest release tarball for an architecture and variant,
//! prepares the destination with privileged commands, downloads the tarball
//! into a persistent cache or a throwaway staging directory and extracts it.
//!
//! A populated destination is never touched unless the caller forces its
//! removal, and every resolution step happens before the first mutation.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::arch::{Architecture, Variant};
use crate::core::manifest::{Mirror, TarballDescriptor};
use crate::error::DeployError;
use crate::infra::download::{DownloadManager, ProgressCallback};
use crate::infra::extract::{self, EntryCallback};
use crate::infra::filesystem;
use crate::infra::process::{CommandRunner, CommandSpec};

/// What to deploy
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Mirror serving the manifest and tarballs
    pub mirror: Mirror,
    /// Distribution variant
    pub variant: Variant,
    /// Remove a populated destination instead of refusing
    pub force: bool,
    /// Keep the tarball in the persistent cache
    pub use_cache: bool,
}

/// Progress hooks; `None` runs the step silently
#[derive(Default)]
pub struct DeployProgress {
    /// Receives (bytes written, total bytes) while downloading
    pub download: Option<ProgressCallback>,
    /// Receives the running entry count while extracting
    pub extract: Option<EntryCallback>,
    /// Called once the transfer has finished
    pub download_done: Option<Box<dyn Fn()>>,
}

/// Result of a deployment that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Sysroot extracted to `path`
    Deployed {
        path: PathBuf,
        tarball: TarballDescriptor,
    },
    /// No tarball for the architecture and variant
    NoRelease,
    /// Destination holds data and removal was not requested
    DestinationNotEmpty,
}

impl DeployOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployOutcome::Deployed { .. } => 0,
            DeployOutcome::NoRelease | DeployOutcome::DestinationNotEmpty => 1,
        }
    }
}

/// Where the tarball lands before extraction
enum Staging {
    Persistent(PathBuf),
    Ephemeral(TempDir),
}

impl Staging {
    fn path(&self) -> &Path {
        match self {
            Staging::Persistent(path) => path,
            Staging::Ephemeral(dir) => dir.path(),
        }
    }

    fn is_persistent(&self) -> bool {
        matches!(self, Staging::Persistent(_))
    }

    /// Remove ephemeral staging; failures are only reported
    fn finish(self) {
        if let Staging::Ephemeral(dir) = self {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove temporary directory {}: {e}", path.display());
            }
        }
    }
}

/// Runs the deployment pipeline
pub struct Deployer<'a> {
    runner: &'a dyn CommandRunner,
    downloader: DownloadManager,
    cache_dir: Option<PathBuf>,
    temp_root: Option<PathBuf>,
}

impl<'a> Deployer<'a> {
    /// Create a deployer running privileged commands through `runner`
    pub fn new(runner: &'a dyn CommandRunner, downloader: DownloadManager) -> Self {
        Self {
            runner,
            downloader,
            cache_dir: None,
            temp_root: None,
        }
    }

    /// Persistent tarball cache used when caching is requested
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Parent of ephemeral staging directories (system temp dir by default)
    #[must_use]
    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Deploy the latest `options.variant` release for `arch` into `dest`
    pub async fn deploy(
        &self,
        arch: Architecture,
        dest: &Path,
        options: &DeployOptions,
        progress: &DeployProgress,
    ) -> Result<DeployOutcome, DeployError> {
        tracing::info!("Fetching manifest from {}", options.mirror.manifest_url());
        let manifest = self.downloader.fetch_manifest(&options.mirror).await?;

        let Some(tarball) = manifest.resolve_latest_tarball(arch, options.variant)? else {
            tracing::error!(
                "No tarball found for architecture {arch} and variant {}",
                options.variant
            );
            return Ok(DeployOutcome::NoRelease);
        };
        let tarball = tarball.clone();

        tracing::info!(
            "Found release {} of {} for {arch}: download {}, installed {}",
            tarball.date,
            options.variant,
            format_size(tarball.download_size),
            format_size(tarball.inst_size)
        );

        let populated = filesystem::is_populated(dest).map_err(|e| DeployError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;
        if populated {
            if !options.force {
                tracing::error!(
                    "Sysroot {} is not empty. Use --force to replace it",
                    dest.display()
                );
                return Ok(DeployOutcome::DestinationNotEmpty);
            }
            tracing::warn!("Removing existing sysroot at {}", dest.display());
            self.privileged(
                "rm",
                CommandSpec::new("rm").arg("-rf").arg_path(dest),
                dest,
            )?;
        }

        if !dest.exists() {
            self.privileged(
                "mkdir",
                CommandSpec::new("mkdir").arg("-p").arg_path(dest),
                dest,
            )?;
        }

        let staging = self.select_staging(options.use_cache)?;
        tracing::debug!("Staging tarball in {}", staging.path().display());

        let tarball_path = self
            .downloader
            .fetch_tarball_cached(
                &tarball,
                staging.path(),
                &options.mirror,
                !staging.is_persistent(),
                progress.download.as_ref(),
            )
            .await?;
        if let Some(done) = &progress.download_done {
            done();
        }

        tracing::info!("Extracting {} to {}", tarball_path.display(), dest.display());
        let entries =
            extract::extract_tarball(self.runner, &tarball_path, dest, progress.extract.as_ref())?;
        tracing::debug!("Extracted {entries} entries");

        staging.finish();

        tracing::info!("Sysroot deployed at {}", dest.display());
        Ok(DeployOutcome::Deployed {
            path: dest.to_path_buf(),
            tarball,
        })
    }

    fn select_staging(&self, use_cache: bool) -> Result<Staging, DeployError> {
        if use_cache {
            match &self.cache_dir {
                Some(dir) => match filesystem::create_dir_all(dir) {
                    Ok(()) => return Ok(Staging::Persistent(dir.clone())),
                    Err(e) => tracing::warn!("Cache unavailable, using a temporary directory: {e}"),
                },
                None => tracing::warn!("No cache directory configured, using a temporary directory"),
            }
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("abcross-");
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map(Staging::Ephemeral).map_err(|e| DeployError::IoError {
            path: self
                .temp_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            error: e.to_string(),
        })
    }

    fn privileged(&self, operation: &str, spec: CommandSpec, path: &Path) -> Result<(), DeployError> {
        let output = self.runner.run(&spec.privileged(true))?;
        if !output.success() {
            tracing::error!(
                "{operation} {} failed with exit status {}",
                path.display(),
                output.code
            );
            return Err(DeployError::PrivilegedOperationFailed {
                operation: operation.to_string(),
                path: path.to_path_buf(),
                code: output.code,
            });
        }
        Ok(())
    }
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else if b < KIB * KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else {
        format!("{:.1} GiB", b / (KIB * KIB * KIB))
    }
}
