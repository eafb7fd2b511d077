//! CLI implementation for `abcross unpack`

use anyhow::{Context as _, Result};

use crate::cli::output::{print_detail, print_success, print_warning};
use crate::cli::Context;
use crate::core::sysroot::{RefreshPolicy, SysrootSession, UnpackOptions};
use crate::error::AbcrossError;

/// Execute the unpack command
pub fn execute(ctx: &Context, packages: &[String], update: bool, strict_refresh: bool) -> Result<i32> {
    let options = UnpackOptions {
        full_upgrade: update,
        refresh_policy: if strict_refresh {
            RefreshPolicy::Strict
        } else {
            RefreshPolicy::Lenient
        },
    };

    let session = SysrootSession::new(ctx.sysroot.clone(), &ctx.runner, ctx.host());
    let unpacked = session
        .unpack_packages(packages, &options)
        .map_err(AbcrossError::from)
        .with_context(|| format!("Failed to unpack packages into {}", ctx.sysroot.path().display()))?;

    if ctx.quiet {
        return Ok(0);
    }

    if unpacked.is_empty() {
        print_warning("Nothing was unpacked");
    } else {
        print_success(&format!("Unpacked {} package(s):", unpacked.len()));
        for deb in &unpacked {
            if let Some(name) = deb.file_name() {
                print_detail(&name.to_string_lossy());
            }
        }
    }

    Ok(0)
}
