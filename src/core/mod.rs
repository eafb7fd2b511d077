//! Core business logic module
//!
//! Side effects go through [`crate::infra`]: downloads through the download
//! manager, external programs through an injected command runner.
//!
//! # Submodules
//!
//! - [`arch`] - Architecture and variant catalog
//! - [`manifest`] - Mirror validation, manifest parsing and tarball resolution
//! - [`deploy`] - Sysroot deployment pipeline
//! - [`sysroot`] - Container, package manager and unpack operations
//! - [`config`] - User configuration file
//! - [`doctor`] - Host checks

pub mod arch;
pub mod config;
pub mod deploy;
pub mod doctor;
pub mod manifest;
pub mod sysroot;
