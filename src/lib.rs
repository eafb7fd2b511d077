//! abcross - AOSC OS cross-compiling sysroot manager
//!
//! Downloads AOSC OS release tarballs for a target architecture, deploys
//! them as sysroots, and runs programs or package tools inside them through
//! `systemd-nspawn` and binfmt_misc emulation.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Catalog, manifest resolution, deployment and sysroot logic
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
