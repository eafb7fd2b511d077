//! Operations on a deployed sysroot
//!
//! Spawning programs inside the sysroot with `systemd-nspawn`, calling the
//! package manager against it, and unpacking extra packages into it.
//!
//! Foreign sysroots run through a QEMU user-mode emulator registered with
//! binfmt_misc; the host check happens before anything is spawned.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::defaults;
use crate::core::arch::Architecture;
use crate::error::SysrootError;
use crate::infra::host::HostPlatform;
use crate::infra::process::{CommandOutput, CommandRunner, CommandSpec};

/// A sysroot installation point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysroot {
    arch: Architecture,
    path: PathBuf,
}

impl Sysroot {
    /// Sysroot for `arch` at `path`
    pub fn new(arch: Architecture, path: impl Into<PathBuf>) -> Self {
        Self {
            arch,
            path: path.into(),
        }
    }

    /// Sysroot at the standard location below `base`
    pub fn standard(arch: Architecture, base: &Path) -> Self {
        Self::new(arch, arch.standard_sysroot(base))
    }

    /// Target architecture
    pub fn arch(&self) -> Architecture {
        self.arch
    }

    /// Root directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container host name, `abcross-<arch>`
    pub fn machine_name(&self) -> String {
        format!("{}-{}", defaults::HOSTNAME_PREFIX, self.arch)
    }
}

/// Package management front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTool {
    Apt,
    Dpkg,
}

impl PackageTool {
    /// Program name
    pub fn program(self) -> &'static str {
        match self {
            PackageTool::Apt => "apt",
            PackageTool::Dpkg => "dpkg",
        }
    }

    /// Arguments pointing the tool at `root` instead of `/`
    fn root_args(self, root: &Path) -> Vec<String> {
        match self {
            PackageTool::Apt => vec!["-o".to_string(), format!("Dir={}", root.display())],
            PackageTool::Dpkg => vec![format!("--root={}", root.display())],
        }
    }
}

/// How a package manager call is run
#[derive(Debug, Clone, Default)]
pub struct PackageCallOptions {
    /// Run inside the sysroot container instead of against its root directory
    pub containerize: bool,
    /// Escalate a direct call; container runs are always privileged
    pub privileged: bool,
    /// Attach to the terminal
    pub interactive: bool,
    /// Extra `systemd-nspawn` arguments for container runs
    pub extra_spawn_args: Vec<String>,
}

/// What to do when refreshing package metadata fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Warn and carry on with possibly stale metadata
    #[default]
    Lenient,
    /// Abort the unpack
    Strict,
}

/// Options for [`SysrootSession::unpack_packages`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpackOptions {
    /// Full upgrade before downloading
    pub full_upgrade: bool,
    /// Handling of a failed metadata refresh
    pub refresh_policy: RefreshPolicy,
}

/// A sysroot together with the host facilities needed to work on it
pub struct SysrootSession<'a> {
    sysroot: Sysroot,
    runner: &'a dyn CommandRunner,
    host: HostPlatform,
    temp_root: Option<PathBuf>,
}

impl<'a> SysrootSession<'a> {
    /// Create a session on `sysroot`
    pub fn new(sysroot: Sysroot, runner: &'a dyn CommandRunner, host: HostPlatform) -> Self {
        Self {
            sysroot,
            runner,
            host,
            temp_root: None,
        }
    }

    /// Parent of temporary package download directories
    #[must_use]
    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// The sysroot
    pub fn sysroot(&self) -> &Sysroot {
        &self.sysroot
    }

    /// Run `argv` (default `/bin/bash`) as pid 2 in a container on the sysroot
    ///
    /// Fails with [`SysrootError::CannotExecute`] without spawning anything
    /// when the host can neither run the architecture natively nor emulate it.
    /// A non-zero exit of the container is returned, not raised.
    pub fn containerize(
        &self,
        argv: Option<&[String]>,
        extra_args: &[String],
        interactive: bool,
    ) -> Result<CommandOutput, SysrootError> {
        let arch = self.sysroot.arch;
        if !self.host.can_execute(arch) {
            let emulator = arch.emulation_binary_name();
            tracing::error!("You can't run program built for {arch}. Install {emulator} first.");
            return Err(SysrootError::CannotExecute {
                arch: arch.to_string(),
                emulator,
            });
        }

        let root = std::fs::canonicalize(&self.sysroot.path)
            .unwrap_or_else(|_| self.sysroot.path.clone());
        let default_argv = [defaults::DEFAULT_SHELL.to_string()];
        let argv = argv.unwrap_or(&default_argv);

        let spec = CommandSpec::new("systemd-nspawn")
            .arg("-D")
            .arg_path(&root)
            .arg("-M")
            .arg(self.sysroot.machine_name())
            .arg("--as-pid2")
            .args(extra_args.iter().cloned())
            .args(argv.iter().cloned())
            .privileged(true)
            .interactive(interactive);

        let output = self.runner.run(&spec)?;
        if !output.success() {
            tracing::error!(
                "Command to start container returned non-zero exit status {}",
                output.code
            );
            tracing::debug!("Command used: {}", spec.display());
        }
        Ok(output)
    }

    /// Call `tool` with `argv` for the sysroot
    ///
    /// Direct calls point the tool at the sysroot with its root-directory
    /// option; containerized calls run the tool inside the sysroot.
    pub fn package_manager_call(
        &self,
        tool: PackageTool,
        argv: &[String],
        options: &PackageCallOptions,
    ) -> Result<CommandOutput, SysrootError> {
        if options.containerize {
            let mut full = vec![tool.program().to_string()];
            full.extend(argv.iter().cloned());
            return self.containerize(
                Some(full.as_slice()),
                &options.extra_spawn_args,
                options.interactive,
            );
        }

        let spec = CommandSpec::new(tool.program())
            .args(tool.root_args(&self.sysroot.path))
            .args(argv.iter().cloned())
            .privileged(options.privileged)
            .interactive(options.interactive);
        Ok(self.runner.run(&spec)?)
    }

    /// Download `names` and their dependencies inside the container, then
    /// force-unpack them into the sysroot from the host
    ///
    /// Packages are unpacked, not configured. Returns the package files that
    /// were unpacked.
    pub fn unpack_packages(
        &self,
        names: &[String],
        options: &UnpackOptions,
    ) -> Result<Vec<PathBuf>, SysrootError> {
        let db = self.sysroot.path.join(defaults::PACKAGE_DB);
        if !db.is_dir() {
            tracing::error!("{} is not a valid AOSC OS sysroot", self.sysroot.path.display());
            return Err(SysrootError::EnvironmentError { path: db });
        }

        let in_container = PackageCallOptions {
            containerize: true,
            interactive: true,
            ..PackageCallOptions::default()
        };

        tracing::info!("Refreshing package metadata");
        let refresh = self.package_manager_call(PackageTool::Apt, &strings(&["update"]), &in_container)?;
        if !refresh.success() {
            match options.refresh_policy {
                RefreshPolicy::Lenient => tracing::warn!(
                    "Refreshing package metadata failed with exit status {}, continuing",
                    refresh.code
                ),
                RefreshPolicy::Strict => {
                    return Err(SysrootError::RefreshFailed { code: refresh.code })
                }
            }
        }

        if options.full_upgrade {
            tracing::info!("Upgrading sysroot");
            let upgrade = self.package_manager_call(
                PackageTool::Apt,
                &strings(&["full-upgrade", "-y", "-o", "Dpkg::Options::=--force-confnew"]),
                &in_container,
            )?;
            if !upgrade.success() {
                return Err(SysrootError::UpgradeFailed { code: upgrade.code });
            }
        }

        let tmp = self.create_download_dir()?;
        let result = self.download_and_unpack(names, tmp.path());
        let cleanup = self.remove_download_dir(tmp.path());
        drop(tmp);

        let unpacked = result?;
        cleanup?;
        Ok(unpacked)
    }

    fn download_and_unpack(&self, names: &[String], tmp: &Path) -> Result<Vec<PathBuf>, SysrootError> {
        tracing::info!("Downloading {} package(s) and dependencies", names.len());
        let mut argv = strings(&["apt-get", "install", "--download-only", "-y", "-o"]);
        argv.push(format!("Dir::Cache::archives={}", defaults::UNPACK_MOUNT));
        argv.extend(names.iter().cloned());
        let bind = format!("--bind={}:{}", tmp.display(), defaults::UNPACK_MOUNT);

        let download = self.containerize(Some(argv.as_slice()), &[bind], true)?;
        if !download.success() {
            return Err(SysrootError::DownloadFailed {
                code: download.code,
            });
        }

        let debs = collect_debs(tmp)?;
        if debs.is_empty() {
            tracing::warn!("No packages were downloaded, nothing to unpack");
            return Ok(debs);
        }

        tracing::info!("Unpacking {} package(s)", debs.len());
        let mut dpkg_args = strings(&[
            "--unpack",
            "--force-architecture",
            "--force-depends",
            "--force-downgrade",
            "--no-triggers",
        ]);
        dpkg_args.extend(debs.iter().map(|p| p.to_string_lossy().into_owned()));

        let unpack = self.package_manager_call(
            PackageTool::Dpkg,
            &dpkg_args,
            &PackageCallOptions {
                privileged: true,
                interactive: true,
                ..PackageCallOptions::default()
            },
        )?;
        if !unpack.success() {
            return Err(SysrootError::UnpackFailed { code: unpack.code });
        }

        Ok(debs)
    }

    fn create_download_dir(&self) -> Result<TempDir, SysrootError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("abcross-debs-");
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| SysrootError::IoError {
            path: self.temp_root.clone().unwrap_or_else(std::env::temp_dir),
            error: e.to_string(),
        })
    }

    /// Downloaded files belong to root, so removal is privileged
    fn remove_download_dir(&self, tmp: &Path) -> Result<(), SysrootError> {
        let output = self
            .runner
            .run(&CommandSpec::new("rm").arg("-rf").arg_path(tmp).privileged(true))?;
        if !output.success() {
            return Err(SysrootError::CleanupFailed {
                path: tmp.to_path_buf(),
                code: output.code,
            });
        }
        Ok(())
    }
}

/// `*.deb` files directly inside `dir`, sorted by name
fn collect_debs(dir: &Path) -> Result<Vec<PathBuf>, SysrootError> {
    let io_error = |e: std::io::Error| SysrootError::IoError {
        path: dir.to_path_buf(),
        error: e.to_string(),
    };

    let mut debs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "deb") {
            debs.push(path);
        }
    }
    debs.sort();
    Ok(debs)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
