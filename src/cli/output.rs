//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars and
//! formatted status messages to the user.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner counting extracted archive entries
///
/// The spinner only draws once the first entry is reported.
pub fn create_entry_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} Extracting: {pos} entries processed")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Create a progress bar for downloads
///
/// The length is filled in by the first progress report.
pub fn create_download_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// Print a success line
pub fn print_success(message: &str) {
    println!("{} {message}", status::SUCCESS);
}

/// Print an informational line
pub fn print_info(message: &str) {
    println!("{} {message}", status::INFO);
}

/// Print a warning line
pub fn print_warning(message: &str) {
    println!("{} {message}", status::WARNING);
}

/// Print an indented detail line
pub fn print_detail(message: &str) {
    println!("    {message}");
}

/// Print an error and its causes to stderr, one line each
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("    caused by: {cause}");
    }
}
