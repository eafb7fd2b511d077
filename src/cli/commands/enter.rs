//! CLI implementation for `abcross enter`

use anyhow::Result;

use crate::cli::Context;
use crate::core::sysroot::SysrootSession;
use crate::error::AbcrossError;

/// Execute the enter command
///
/// Returns the exit status of the program run in the container.
pub fn execute(ctx: &Context, argv: &[String]) -> Result<i32> {
    let session = SysrootSession::new(ctx.sysroot.clone(), &ctx.runner, ctx.host());
    let argv = (!argv.is_empty()).then_some(argv);

    let output = session
        .containerize(argv, &[], true)
        .map_err(AbcrossError::from)?;
    Ok(output.code)
}
