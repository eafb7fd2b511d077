//! Tarball extraction
//!
//! Unpacks a release tarball into an empty sysroot directory with a
//! privileged `tar`, keeping permissions, ownership and extended attributes.

use std::path::Path;

use crate::error::ExtractError;
use crate::infra::filesystem;
use crate::infra::process::{CommandRunner, CommandSpec};

/// Callback receiving the running count of extracted entries
pub type EntryCallback = Box<dyn Fn(u64)>;

/// Build the archiver invocation for `tarball` into `dest`
///
/// Compression is detected by tar itself. Running as root, GNU tar restores
/// the recorded owners; `--numeric-owner` keeps the target's uid/gid numbers
/// instead of mapping them through the host's user database.
pub fn tar_command(tarball: &Path, dest: &Path) -> CommandSpec {
    CommandSpec::new("tar")
        .args(["-x", "-v", "-p", "--xattrs", "--xattrs-include=*", "--numeric-owner", "-f"])
        .arg_path(tarball)
        .arg("-C")
        .arg_path(dest)
        .privileged(true)
}

/// Extract `tarball` into the empty directory `dest`
///
/// Refuses to merge into existing content. `progress`, when given, is called
/// with the running entry count; `None` extracts silently. Returns the
/// number of entries tar reported.
pub fn extract_tarball(
    runner: &dyn CommandRunner,
    tarball: &Path,
    dest: &Path,
    progress: Option<&EntryCallback>,
) -> Result<u64, ExtractError> {
    check_inputs(tarball, dest)?;

    let mut count: u64 = 0;
    let output = runner.run_streaming(&tar_command(tarball, dest), &mut |_line: &str| {
        count += 1;
        if let Some(cb) = progress {
            cb(count);
        }
    })?;

    tracing::debug!("Expanded archive. Written {count} files.");

    if !output.success() {
        return Err(ExtractError::ExtractionFailed {
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(count)
}

fn check_inputs(tarball: &Path, dest: &Path) -> Result<(), ExtractError> {
    if !tarball.is_file() {
        return Err(ExtractError::InvalidInput {
            message: format!(
                "tarball '{}' doesn't exist or is not a regular file",
                tarball.display()
            ),
        });
    }

    if !dest.is_dir() {
        return Err(ExtractError::InvalidInput {
            message: format!("destination '{}' is not a directory", dest.display()),
        });
    }

    match filesystem::is_dir_empty(dest) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ExtractError::InvalidInput {
            message: format!(
                "destination '{}' is not empty. Refusing to overwrite",
                dest.display()
            ),
        }),
        Err(e) => Err(ExtractError::InvalidInput {
            message: e.to_string(),
        }),
    }
}
