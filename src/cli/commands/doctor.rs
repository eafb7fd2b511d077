//! CLI implementation for `abcross doctor`
//!
//! Checks host tools and emulation support and reports issues with suggestions.

use crate::cli::output::{print_detail, print_info, print_success, status};
use crate::cli::Context;
use crate::core::doctor::run_doctor;

/// Execute the doctor command, returning the process exit status
pub fn execute(ctx: &Context) -> i32 {
    let host = ctx.host();
    let report = run_doctor(ctx.arch, &host, ctx.runner.escalation());

    // Quiet mode - only show errors
    if ctx.quiet {
        for check in report.failed_required() {
            eprintln!("{} Missing required: {}", status::ERROR, check.name);
        }
        return report.exit_code();
    }

    print_info(&format!(
        "Checking host {} for {} sysroots...",
        host.machine(),
        ctx.arch
    ));
    println!();

    for check in &report.checks {
        let detail = check
            .detail
            .as_ref()
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        let required = if check.required { "" } else { " [optional]" };

        if check.passed {
            println!("  {} {}{detail}{required}", status::SUCCESS, check.name);
        } else {
            println!("  {} {}{required}", status::ERROR, check.name);
            if let Some(error) = &check.error {
                print_detail(&format!("Error: {error}"));
            }
            if let Some(suggestion) = &check.suggestion {
                print_detail(&format!("Suggestion: {suggestion}"));
            }
        }
    }

    println!();
    let passed = report.passed_count();
    let total = report.checks.len();
    if report.all_required_passed() {
        print_success(&format!("{passed}/{total} checks passed"));
    } else {
        println!("{} {passed}/{total} checks passed", status::ERROR);
        print_detail("Please install missing required tools");
    }

    report.exit_code()
}
