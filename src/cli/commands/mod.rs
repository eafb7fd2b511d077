//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod deploy;
pub mod doctor;
pub mod enter;
pub mod unpack;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::Context;
use crate::core::arch::Variant;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and deploy a cross compile sysroot
    Deploy {
        /// Use specified mirror. Defaults to "https://repo.aosc.io/"
        #[arg(short, long)]
        mirror: Option<String>,

        /// Download tarball of specified variant. Defaults to BuildKit
        #[arg(short = 'v', long)]
        variant: Option<Variant>,

        /// Force overwriting a sysroot directory with existing data
        #[arg(short, long)]
        force: bool,

        /// Keep tarballs in ~/.cache/abcross/ instead of a temporary directory
        #[arg(short, long)]
        cache: bool,
    },

    /// Start an interactive shell or program in the sysroot
    Enter {
        /// Program and arguments to spawn in the container. Defaults to "/bin/bash"
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },

    /// Unpack packages and their dependencies in the sysroot
    Unpack {
        /// Do a full upgrade before unpacking specified packages
        #[arg(short = 'u', long)]
        update: bool,

        /// Abort when refreshing package metadata fails
        #[arg(long)]
        strict_refresh: bool,

        /// Package names to unpack
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Check host tools and emulation support
    Doctor,
}

impl Commands {
    /// Execute the command, returning the process exit status
    pub async fn run(self, ctx: &Context) -> Result<i32> {
        match self {
            Self::Deploy {
                mirror,
                variant,
                force,
                cache,
            } => {
                let args = deploy::DeployArgs {
                    mirror,
                    variant,
                    force,
                    cache,
                };
                deploy::execute(ctx, args).await
            }
            Self::Enter { argv } => enter::execute(ctx, &argv),
            Self::Unpack {
                update,
                strict_refresh,
                packages,
            } => unpack::execute(ctx, &packages, update, strict_refresh),
            Self::Doctor => Ok(doctor::execute(ctx)),
        }
    }
}
