//! CLI implementation for `abcross deploy`

use anyhow::{Context as _, Result};

use crate::cli::output::{self, print_detail, print_success};
use crate::cli::Context;
use crate::core::arch::Variant;
use crate::core::deploy::{format_size, DeployOptions, DeployOutcome, DeployProgress, Deployer};
use crate::core::manifest::Mirror;
use crate::error::AbcrossError;
use crate::infra::download::DownloadManager;

/// Arguments of the deploy command
#[derive(Debug, Clone, Default)]
pub struct DeployArgs {
    /// Mirror override
    pub mirror: Option<String>,
    /// Variant override
    pub variant: Option<Variant>,
    /// Replace a populated sysroot
    pub force: bool,
    /// Keep the tarball in the persistent cache
    pub cache: bool,
}

/// Execute the deploy command
pub async fn execute(ctx: &Context, args: DeployArgs) -> Result<i32> {
    let mirror = Mirror::parse(args.mirror.as_deref().unwrap_or(ctx.config.mirror()))
        .map_err(AbcrossError::from)?;
    let variant = match args.variant {
        Some(variant) => variant,
        None => ctx.config.variant().map_err(AbcrossError::from)?,
    };

    let options = DeployOptions {
        mirror,
        variant,
        force: args.force,
        use_cache: args.cache,
    };

    let download_bar = output::create_download_bar();
    let entry_spinner = output::create_entry_spinner();
    let progress = if ctx.quiet {
        DeployProgress::default()
    } else {
        let bar = download_bar.clone();
        let finished = download_bar.clone();
        let spinner = entry_spinner.clone();
        DeployProgress {
            download: Some(Box::new(move |done, total| {
                bar.set_length(total);
                bar.set_position(done);
            })),
            download_done: Some(Box::new(move || finished.finish_and_clear())),
            extract: Some(Box::new(move |entries| spinner.set_position(entries))),
        }
    };

    let deployer = Deployer::new(&ctx.runner, DownloadManager::new())
        .cache_dir(ctx.config.cache_dir(&ctx.dirs));
    let result = deployer
        .deploy(ctx.arch, ctx.sysroot.path(), &options, &progress)
        .await;
    download_bar.finish_and_clear();
    entry_spinner.finish_and_clear();

    let outcome = result
        .map_err(AbcrossError::from)
        .with_context(|| format!("Failed to deploy {} sysroot", ctx.arch))?;

    if let DeployOutcome::Deployed { path, tarball } = &outcome {
        if !ctx.quiet {
            print_success(&format!("Sysroot deployed at {}", path.display()));
            print_detail(&format!(
                "{variant} {} for {}, {} installed",
                tarball.date,
                ctx.arch,
                format_size(tarball.inst_size)
            ));
        }
    }

    Ok(outcome.exit_code())
}
