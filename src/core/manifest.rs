//! Release manifest parsing and tarball resolution
//!
//! The mirror publishes `aosc-os/manifest/recipe.json`, listing every
//! release tarball grouped by variant. This module parses that document and
//! picks the latest tarball for an (architecture, variant) pair.

use std::path::Path;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::urls;
use crate::core::arch::{Architecture, Variant};
use crate::error::{DownloadError, ManifestError};

/// A validated mirror root
///
/// Construction checks that the manifest URL derived from the mirror parses
/// and uses one of the accepted schemes, so later URL building cannot pick
/// up an unsupported transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    root: String,
    manifest_url: Url,
}

impl Mirror {
    /// Validate a mirror root such as `https://repo.aosc.io/`
    pub fn parse(mirror: &str) -> Result<Self, ManifestError> {
        let root = mirror.trim_end_matches('/').to_string();
        let manifest_url = format!("{root}/{}/{}", urls::RELEASE_BASE, urls::MANIFEST_PATH);

        let url = Url::parse(&manifest_url).map_err(|e| ManifestError::InvalidMirrorUrl {
            url: mirror.to_string(),
            reason: e.to_string(),
        })?;

        if !urls::ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(ManifestError::InvalidMirrorUrl {
                url: mirror.to_string(),
                reason: format!(
                    "scheme '{}' is not one of {}",
                    url.scheme(),
                    urls::ALLOWED_SCHEMES.join(", ")
                ),
            });
        }

        Ok(Self {
            root,
            manifest_url: url,
        })
    }

    /// Mirror root without a trailing slash
    pub fn root(&self) -> &str {
        &self.root
    }

    /// URL of the release manifest
    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    /// URL of a file below the release tree, e.g. a tarball `path`
    pub fn release_url(&self, relative: &str) -> Result<Url, DownloadError> {
        let url = format!(
            "{}/{}/{}",
            self.root,
            urls::RELEASE_BASE,
            relative.trim_start_matches('/')
        );
        Url::parse(&url).map_err(|e| DownloadError::InvalidUrl {
            url,
            reason: e.to_string(),
        })
    }
}

/// Parsed release manifest
///
/// Only the parts this tool needs are modelled; bulletins, mirror lists and
/// descriptions are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Release groups, one per variant. `None` when the key is missing.
    #[serde(default)]
    pub variants: Option<Vec<VariantRelease>>,
}

/// Releases of one variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRelease {
    /// Variant label, e.g. `BuildKit`
    pub name: String,
    /// Published tarballs
    #[serde(default)]
    pub tarballs: Vec<TarballDescriptor>,
}

/// One release tarball
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TarballDescriptor {
    /// AOSC OS architecture identifier
    pub arch: String,
    /// Release date, `YYYYMMDD`
    pub date: String,
    /// Compressed size in bytes
    #[serde(default)]
    pub download_size: u64,
    /// Installed size in bytes
    #[serde(default)]
    pub inst_size: u64,
    /// Path relative to the release tree
    pub path: String,
    /// Hex-encoded SHA-256 of the tarball
    #[serde(default, rename = "sha256sum")]
    pub sha256sum: Option<String>,
}

impl TarballDescriptor {
    /// File name part of `path`
    pub fn file_name(&self) -> Option<&str> {
        Path::new(&self.path).file_name().and_then(|n| n.to_str())
    }
}

impl Manifest {
    /// Parse a manifest document
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(content).map_err(|e| ManifestError::Malformed {
            message: e.to_string(),
        })
    }

    /// Latest tarball for `arch` in `variant`
    ///
    /// Returns `Ok(None)` when the variant is absent or has no tarball for
    /// the architecture. Groups sharing a name are merged in document order.
    /// Entries with architectures this tool does not know are skipped.
    pub fn resolve_latest_tarball(
        &self,
        arch: Architecture,
        variant: Variant,
    ) -> Result<Option<&TarballDescriptor>, ManifestError> {
        let groups = self
            .variants
            .as_ref()
            .ok_or_else(|| ManifestError::Malformed {
                message: "manifest has no variants list".to_string(),
            })?;

        let mut latest: Option<&TarballDescriptor> = None;
        for tarball in groups
            .iter()
            .filter(|g| g.name == variant.label())
            .flat_map(|g| g.tarballs.iter())
        {
            match tarball.arch.parse::<Architecture>() {
                Ok(a) if a == arch => {}
                Ok(_) => continue,
                Err(_) => {
                    tracing::debug!("Skipping tarball with unknown architecture '{}'", tarball.arch);
                    continue;
                }
            }

            // Strictly greater keeps the first of equal dates
            if latest.map_or(true, |l| tarball.date > l.date) {
                latest = Some(tarball);
            }
        }

        Ok(latest)
    }
}
