//! abcross CLI - AOSC OS cross-compiling sysroot manager
//!
//! Entry point for the abcross command-line application.

use clap::Parser;
use tracing::level_filters::LevelFilter;

use abcross::cli::output::display_error;
use abcross::cli::{exit_status, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Run the command and handle errors
    let code = match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            display_error(&e);
            exit_status(&e)
        }
    };
    std::process::exit(code);
}
