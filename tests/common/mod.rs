//! Common test utilities and helpers
//!
//! This module provides shared fixtures for integration tests: a scratch
//! directory, release tarballs built in memory, and manifests describing them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use abcross::infra::download::compute_checksum;

/// Relative path of the fixture tarball below `aosc-os/`
pub const TARBALL_PATH: &str = "os-amd64/buildkit/aosc-os_buildkit_20220826_amd64.tar";

/// Scratch area for a test
pub struct TestEnv {
    /// Temporary directory holding everything
    pub dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path below the environment root
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create a directory below the environment root
    pub fn create_dir(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }

    /// Write a file below the environment root
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Config directory whose config.toml disables privilege escalation
    pub fn config_without_escalation(&self) -> PathBuf {
        self.create_file("config/config.toml", "escalation = \"\"\n");
        self.path("config")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an uncompressed tar archive with the given regular files
pub fn build_tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_661_472_000);
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("Failed to append tar entry");
    }
    builder.into_inner().expect("Failed to finish tarball")
}

/// A minimal amd64 BuildKit sysroot
pub fn sysroot_tarball() -> Vec<u8> {
    build_tarball(&[
        ("etc/os-release", "NAME=\"AOSC OS\"\nID=aosc\n"),
        ("var/lib/dpkg/status", ""),
        ("usr/bin/placeholder", "#!/bin/sh\n"),
    ])
}

/// Manifest advertising `tarball` for amd64 BuildKit, plus an older release
pub fn manifest_for(tarball: &[u8]) -> String {
    serde_json::json!({
        "bulletin": { "title": "Test mirror", "type": "info" },
        "variants": [
            {
                "name": "BuildKit",
                "retro": false,
                "tarballs": [
                    {
                        "arch": "amd64",
                        "date": "20220508",
                        "downloadSize": 1,
                        "instSize": 1,
                        "path": "os-amd64/buildkit/aosc-os_buildkit_20220508_amd64.tar",
                        "sha256sum": "0000000000000000000000000000000000000000000000000000000000000000"
                    },
                    {
                        "arch": "amd64",
                        "date": "20220826",
                        "downloadSize": tarball.len(),
                        "instSize": 8192,
                        "path": TARBALL_PATH,
                        "sha256sum": compute_checksum(tarball)
                    }
                ]
            }
        ]
    })
    .to_string()
}

/// Mock mirror serving the manifest and the fixture tarball
///
/// The tarball mock expects exactly `tarball_requests` hits.
pub async fn mock_mirror(tarball: &[u8], tarball_requests: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/aosc-os/manifest/recipe.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(manifest_for(tarball)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/aosc-os/{TARBALL_PATH}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(tarball.to_vec()))
        .expect(tarball_requests)
        .mount(&server)
        .await;
    server
}

/// Lay out a `file://` mirror under `root`
pub fn local_mirror(root: &Path, tarball: &[u8]) {
    let release = root.join("aosc-os");
    std::fs::create_dir_all(release.join("manifest")).expect("Failed to create mirror");
    std::fs::write(release.join("manifest/recipe.json"), manifest_for(tarball))
        .expect("Failed to write manifest");
    let tarball_path = release.join(TARBALL_PATH);
    std::fs::create_dir_all(tarball_path.parent().expect("tarball has a parent"))
        .expect("Failed to create mirror tree");
    std::fs::write(tarball_path, tarball).expect("Failed to write tarball");
}

/// Whether the host has the archiver the extraction step runs
pub fn has_tar() -> bool {
    which::which("tar").is_ok()
}
