//! HTTP download functionality
//!
//! Fetches the release manifest and streams release tarballs to disk with
//! progress reporting and SHA-256 verification. `file://` mirrors are read
//! straight from the local filesystem.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::Url;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

use crate::config::defaults;
use crate::core::manifest::{Manifest, Mirror, TarballDescriptor};
use crate::error::{DownloadError, ManifestError};

/// Progress callback type for download progress reporting
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Download result containing file path and metadata
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA256 checksum of the downloaded content, when one was computed
    pub checksum: Option<String>,
}

/// Download manager for the manifest and release tarballs
///
/// There is no retry and no overall timeout: a failed transfer is reported
/// to the caller, a stalled one waits.
#[derive(Debug, Clone)]
pub struct DownloadManager {
    /// HTTP client
    client: reqwest::Client,
}

impl DownloadManager {
    /// Create a new download manager
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS))
                .user_agent(concat!("abcross/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Fetch and parse the release manifest of `mirror`
    pub async fn fetch_manifest(&self, mirror: &Mirror) -> Result<Manifest, ManifestError> {
        let url = mirror.manifest_url();
        let network_error = |error: String| ManifestError::NetworkError {
            url: url.to_string(),
            error,
        };

        let body = if url.scheme() == "file" {
            let path = local_path(url).map_err(network_error)?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| network_error(e.to_string()))?
        } else {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| network_error(e.to_string()))?;

            if !response.status().is_success() {
                return Err(network_error(format!("HTTP {}", response.status())));
            }

            response
                .text()
                .await
                .map_err(|e| network_error(e.to_string()))?
        };

        tracing::debug!("Fetched manifest from {url} ({} bytes)", body.len());
        Manifest::from_json(&body)
    }

    /// Download `url` to `dest`, verifying the SHA-256 if `expected_checksum` is given
    ///
    /// On a checksum mismatch or a failed transfer the partial file is
    /// removed before the error is returned.
    pub async fn download_verified(
        &self,
        url: &Url,
        dest: &Path,
        expected_checksum: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> Result<DownloadResult, DownloadError> {
        let result = match self
            .download_once(url, dest, expected_checksum.is_some(), progress)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                return Err(e);
            }
        };

        tracing::info!(
            "Tarball downloaded to {}. Written {} bytes.",
            dest.display(),
            result.size
        );

        if let (Some(expected), Some(actual)) = (expected_checksum, result.checksum.as_deref()) {
            if actual != expected.to_lowercase() {
                // Delete corrupted download
                let _ = tokio::fs::remove_file(dest).await;

                return Err(DownloadError::ChecksumMismatch {
                    file: dest.display().to_string(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        Ok(result)
    }

    /// Single download attempt
    async fn download_once(
        &self,
        url: &Url,
        dest: &Path,
        hash: bool,
        progress: Option<&ProgressCallback>,
    ) -> Result<DownloadResult, DownloadError> {
        let network_error = |error: String| DownloadError::NetworkError {
            url: url.to_string(),
            error,
        };

        if url.scheme() == "file" {
            let path = local_path(url).map_err(network_error)?;
            let file = File::open(&path)
                .await
                .map_err(|e| network_error(e.to_string()))?;
            let total = file.metadata().await.map(|m| m.len()).unwrap_or(0);
            return write_stream(file_chunks(file), url, dest, total, hash, progress).await;
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| network_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(network_error(format!("HTTP {}", response.status())));
        }

        let total = response.content_length().unwrap_or(0);
        write_stream(response.bytes_stream(), url, dest, total, hash, progress).await
    }

    /// Download a release tarball into `dest_dir`, reusing an existing copy
    ///
    /// The file is saved as `dest_dir/<basename of descriptor.path>`. When
    /// `overwrite` is false and that file already exists it is returned as
    /// is, without a request and without re-verifying it.
    pub async fn fetch_tarball_cached(
        &self,
        descriptor: &TarballDescriptor,
        dest_dir: &Path,
        mirror: &Mirror,
        overwrite: bool,
        progress: Option<&ProgressCallback>,
    ) -> Result<PathBuf, DownloadError> {
        let file_name = descriptor
            .file_name()
            .ok_or_else(|| DownloadError::InvalidUrl {
                url: descriptor.path.clone(),
                reason: "tarball path has no file name".to_string(),
            })?;
        let dest = dest_dir.join(file_name);

        if !overwrite && dest.exists() {
            tracing::info!("Using cached tarball {}", dest.display());
            return Ok(dest);
        }

        remove_stale(&dest).await?;

        let url = mirror.release_url(&descriptor.path)?;
        tracing::info!("Downloading {url}");
        self.download_verified(&url, &dest, descriptor.sha256sum.as_deref(), progress)
            .await?;

        Ok(dest)
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a byte stream to `dest` through a 1 MiB buffer, hashing if asked
async fn write_stream<S, B, E>(
    mut stream: S,
    url: &Url,
    dest: &Path,
    total_size: u64,
    hash: bool,
    progress: Option<&ProgressCallback>,
) -> Result<DownloadResult, DownloadError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let io_error = |e: std::io::Error| DownloadError::IoError {
        path: dest.to_path_buf(),
        error: e.to_string(),
    };

    // Create parent directories if needed
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::IoError {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
    }

    let file = File::create(dest).await.map_err(io_error)?;
    let mut writer = BufWriter::with_capacity(defaults::DOWNLOAD_CHUNK_SIZE, file);

    let mut hasher = hash.then(Sha256::new);
    let mut downloaded: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::NetworkError {
            url: url.to_string(),
            error: e.to_string(),
        })?;
        let chunk = chunk.as_ref();

        writer.write_all(chunk).await.map_err(io_error)?;

        if let Some(hasher) = hasher.as_mut() {
            hasher.update(chunk);
        }
        downloaded += chunk.len() as u64;

        if let Some(cb) = progress {
            cb(downloaded, total_size);
        }
    }

    writer.flush().await.map_err(io_error)?;

    Ok(DownloadResult {
        path: dest.to_path_buf(),
        size: downloaded,
        checksum: hasher.map(|h| hex::encode(h.finalize())),
    })
}

/// Read a local file as a stream of 1 MiB chunks
fn file_chunks(file: File) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Unpin {
    Box::pin(futures::stream::unfold(Some(file), |state| async move {
        let mut file = state?;
        let mut buf = vec![0u8; defaults::DOWNLOAD_CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(file)))
            }
            Err(e) => Some((Err(e), None)),
        }
    }))
}

/// Local path of a `file://` URL
fn local_path(url: &Url) -> Result<PathBuf, String> {
    url.to_file_path()
        .map_err(|()| format!("'{url}' is not a valid local path"))
}

/// Remove whatever occupies `path` so a fresh download can take its place
async fn remove_stale(path: &Path) -> Result<(), DownloadError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => return Ok(()),
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    result.map_err(|e| DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
