//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

use crate::core::arch::Architecture;
use crate::core::config::AbcrossConfig;
use crate::core::sysroot::Sysroot;
use crate::error::AbcrossError;
use crate::infra::dirs::AbcrossDirs;
use crate::infra::host::HostPlatform;
use crate::infra::process::SystemRunner;

/// AOSC OS cross-compiling sysroot manager
#[derive(Parser, Debug)]
#[command(name = "abcross")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Work on the sysroot for the specified architecture
    #[arg(short, long)]
    pub arch: Architecture,

    /// Path to the sysroot. Defaults to "/var/ab/cross-root/<arch>"
    #[arg(short, long)]
    pub sysroot: Option<PathBuf>,

    /// Enable verbose output (--verbose for debug, twice for trace)
    #[arg(long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Everything a command needs, resolved once from flags and config
pub struct Context {
    /// Target architecture
    pub arch: Architecture,
    /// Sysroot to work on
    pub sysroot: Sysroot,
    /// Loaded configuration
    pub config: AbcrossConfig,
    /// Per-user directories
    pub dirs: AbcrossDirs,
    /// Runner for external programs
    pub runner: SystemRunner,
    /// Suppress progress and summaries
    pub quiet: bool,
}

impl Context {
    /// Host platform, reading binfmt registrations from the configured directory
    pub fn host(&self) -> HostPlatform {
        HostPlatform::detect(self.config.binfmt_dir())
    }
}

impl Cli {
    /// Execute the CLI command, returning the process exit status
    pub async fn run(self) -> Result<i32> {
        let dirs = AbcrossDirs::new();
        let config = AbcrossConfig::load(&dirs).map_err(AbcrossError::from)?;

        let runner = match config.escalation() {
            Some(program) => SystemRunner::new(program),
            None => SystemRunner::without_escalation(),
        };
        let sysroot = match self.sysroot {
            Some(path) => Sysroot::new(self.arch, path),
            None => Sysroot::standard(self.arch, &config.sysroot_base()),
        };
        tracing::debug!("Working on {} sysroot at {}", self.arch, sysroot.path().display());

        let ctx = Context {
            arch: self.arch,
            sysroot,
            config,
            dirs,
            runner,
            quiet: self.quiet,
        };
        self.command.run(&ctx).await
    }
}

/// Exit status for a failed command
///
/// Domain errors anywhere in the chain decide the status; anything else is 1.
pub fn exit_status(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AbcrossError>())
        .map_or(1, AbcrossError::exit_code)
}
