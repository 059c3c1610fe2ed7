// SPDX-License-Identifier: MPL-2.0
//! Weight provisioning: lazy download of model files on first use.
//!
//! [`ensure_weights`] checks for the weight file and downloads it when
//! absent. Presence alone is sufficient; an existing file is never
//! re-downloaded or checksummed here. Integrity checks are available
//! separately via [`verify_checksum`].

use crate::error::{Error, Result};
use crate::registry::ModelConfig;
use futures_util::StreamExt;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

const USER_AGENT: &str = concat!("nafnet-restore/", env!("CARGO_PKG_VERSION"));

/// Download facility behind a seam so tests can observe and count calls.
pub trait WeightFetcher {
    /// Downloads `url` into `dest`, reporting fractional progress in `0..=1`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] on network failure and [`Error::Io`] when
    /// the destination cannot be written.
    fn fetch(&self, url: &str, dest: &Path, progress: &mut dyn FnMut(f32)) -> Result<u64>;
}

/// Streaming HTTP fetcher (reqwest over rustls).
///
/// The download is written to a sibling `.part` file and renamed into place
/// once complete, so a reader never observes a partially written weight file
/// at the final path.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl WeightFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path, progress: &mut dyn FnMut(f32)) -> Result<u64> {
        // The public contract is synchronous; the streaming download runs on
        // a private current-thread runtime.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Io(e.to_string()))?;
        runtime.block_on(download(url, dest, progress))
    }
}

async fn download(url: &str, dest: &Path, progress: &mut dyn FnMut(f32)) -> Result<u64> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::Download(format!(
            "HTTP status: {}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut partial = PartialDownload::create(dest)?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Download(e.to_string()))?;
        partial.write_chunk(&chunk)?;

        if total_size > 0 {
            #[allow(clippy::cast_precision_loss)]
            progress(partial.written() as f32 / total_size as f32);
        }
    }

    partial.commit()
}

/// In-progress download written to a sibling `.part` file.
///
/// [`commit`](Self::commit) renames the finished file into place. A guard
/// dropped without committing (any error path) removes the partial file, so
/// neither the final path nor the `.part` path ever holds an incomplete
/// download.
struct PartialDownload {
    final_path: PathBuf,
    partial: PathBuf,
    file: Option<std::fs::File>,
    written: u64,
}

impl PartialDownload {
    fn create(dest: &Path) -> Result<Self> {
        let partial = partial_path(dest);
        let file = std::fs::File::create(&partial).map_err(|e| Error::Io(e.to_string()))?;
        Ok(Self {
            final_path: dest.to_path_buf(),
            partial,
            file: Some(file),
            written: 0,
        })
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            Error::Io("Partial download already finished".to_string())
        })?;
        file.write_all(chunk).map_err(|e| Error::Io(e.to_string()))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }

    fn commit(mut self) -> Result<u64> {
        drop(self.file.take());
        std::fs::rename(&self.partial, &self.final_path).map_err(|e| Error::Io(e.to_string()))?;
        Ok(self.written)
    }
}

impl Drop for PartialDownload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}

/// Sibling path the in-progress download is written to.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map_or_else(|| OsStr::new("download").to_os_string(), OsStr::to_os_string);
    name.push(".part");
    dest.with_file_name(name)
}

/// Ensures the weight file referenced by `config` exists locally.
///
/// Returns immediately if a file is already present at the configured path,
/// regardless of its contents. Otherwise creates the parent directories and
/// downloads from the configured URL.
///
/// # Errors
///
/// Returns [`Error::Download`] when the configuration carries no URL or the
/// download fails, and [`Error::Io`] for filesystem failures.
pub fn ensure_weights(
    config: &ModelConfig,
    fetcher: &dyn WeightFetcher,
    progress: &mut dyn FnMut(f32),
) -> Result<()> {
    if config.model_path.is_file() {
        return Ok(());
    }

    let url = config.model_url.as_deref().ok_or_else(|| {
        Error::Download(format!(
            "No download URL for weight file {}",
            config.model_path.display()
        ))
    })?;

    if let Some(parent) = config.model_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Io(e.to_string()))?;
    }

    fetcher.fetch(url, &config.model_path, progress)?;
    Ok(())
}

/// Checks whether a weight file exists at `path`.
#[must_use]
pub fn is_weight_present(path: &Path) -> bool {
    path.is_file()
}

/// Deletes the weight file at `path`, if present.
///
/// # Errors
///
/// Returns [`Error::Io`] when removal fails.
pub fn delete_weights(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| Error::Io(e.to_string()))?;
    }
    Ok(())
}

/// Computes the BLAKE3 hash of the weight file at `path`.
///
/// # Errors
///
/// Returns [`Error::ModelNotFound`] when the file is absent.
pub fn compute_weight_hash(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::ModelNotFound(path.to_path_buf()));
    }

    let file_data = std::fs::read(path).map_err(|e| Error::Io(e.to_string()))?;
    Ok(blake3::hash(&file_data).to_hex().to_string())
}

/// Verifies the weight file at `path` against an expected BLAKE3 hash.
///
/// # Errors
///
/// Returns [`Error::ChecksumMismatch`] when the hashes differ.
pub fn verify_checksum(path: &Path, expected_hash: &str) -> Result<()> {
    let actual_hash = compute_weight_hash(path)?;

    if actual_hash != expected_hash {
        return Err(Error::ChecksumMismatch {
            expected: expected_hash.to_string(),
            actual: actual_hash,
        });
    }

    Ok(())
}
