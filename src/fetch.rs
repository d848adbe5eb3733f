// src/fetch.rs

//! Release archive acquisition
//!
//! Locates a release archive on disk or downloads one over HTTP. The
//! engine never touches the network; this module hands it a single file
//! path to open.

use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout for connection establishment. The transfer itself is unbounded;
/// release archives are large.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for failed downloads
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Find exactly one `*.tar.gz` release archive in a directory.
///
/// Zero candidates, more than one candidate, and a file below the
/// variant's size floor are each rejected with a distinct error so the
/// caller can tell the user what to fix.
pub fn locate_archive(dir: &Path, min_bytes: u64) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(".tar.gz") && entry.file_type()?.is_file() {
            candidates.push(entry.path());
        }
    }

    match candidates.len() {
        0 => Err(Error::NotFoundError(format!(
            "no release archive (*.tar.gz) found in {}",
            dir.display()
        ))),
        1 => {
            let path = candidates.remove(0);
            let size = fs::metadata(&path)?.len();
            if size < min_bytes {
                return Err(Error::ArchiveError(format!(
                    "{} looks too small to be a release archive ({} bytes, expected at least {})",
                    path.display(),
                    size,
                    min_bytes
                )));
            }
            debug!("located release archive {} ({} bytes)", path.display(), size);
            Ok(path)
        }
        n => Err(Error::ArchiveError(format!(
            "found {} release archives in {}; keep exactly one",
            n,
            dir.display()
        ))),
    }
}

/// Create a styled progress bar for archive downloads
pub fn download_bar(name: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    bar.set_message(name.to_string());
    bar
}

/// Stream an HTTP response body to a file with optional progress tracking.
///
/// Always streams in chunks, never buffering the entire response in memory.
fn stream_response_to_file(
    mut response: reqwest::blocking::Response,
    file: &mut File,
    total_size: u64,
    progress_bar: Option<&ProgressBar>,
) -> Result<u64> {
    if let Some(pb) = progress_bar {
        pb.set_length(total_size);
    }

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::IoError(format!("failed to read response: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::IoError(format!("failed to write data: {e}")))?;

        downloaded += bytes_read as u64;

        if let Some(pb) = progress_bar {
            pb.set_position(downloaded);
        }
    }

    Ok(downloaded)
}

/// HTTP client wrapper with retry support
pub struct UpdateClient {
    client: Client,
    max_retries: u32,
}

impl UpdateClient {
    /// Create a new client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .build()
            .map_err(|e| Error::InitError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Download a release archive to `dest_path` with retry support.
    ///
    /// Streams to a temporary file first and renames into place so an
    /// interrupted download never leaves a half-written archive behind.
    pub fn download_file(
        &self,
        url: &str,
        dest_path: &Path,
        progress_bar: Option<&ProgressBar>,
    ) -> Result<()> {
        info!("downloading {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    let total_size = response.content_length().unwrap_or(0);

                    let temp_path = dest_path.with_extension("tmp");
                    let mut file = File::create(&temp_path).map_err(|e| {
                        Error::IoError(format!(
                            "failed to create file {}: {e}",
                            temp_path.display()
                        ))
                    })?;

                    let downloaded =
                        stream_response_to_file(response, &mut file, total_size, progress_bar)?;

                    if let Some(pb) = progress_bar {
                        pb.finish_with_message("download complete");
                    }

                    fs::rename(&temp_path, dest_path).map_err(|e| {
                        Error::IoError(format!(
                            "failed to move {} to {}: {e}",
                            temp_path.display(),
                            dest_path.display()
                        ))
                    })?;

                    info!("downloaded {} bytes to {}", downloaded, dest_path.display());
                    return Ok(());
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "failed to download after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("download attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_none_found() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "x").unwrap();

        let result = locate_archive(temp.path(), 0);
        assert!(matches!(result, Err(Error::NotFoundError(_))));
    }

    #[test]
    fn test_locate_too_many_found() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.tar.gz"), "x").unwrap();
        fs::write(temp.path().join("b.tar.gz"), "x").unwrap();

        let result = locate_archive(temp.path(), 0);
        assert!(matches!(result, Err(Error::ArchiveError(_))));
    }

    #[test]
    fn test_locate_too_small_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("release.tar.gz"), "tiny").unwrap();

        let result = locate_archive(temp.path(), 1024);
        assert!(matches!(result, Err(Error::ArchiveError(_))));
    }

    #[test]
    fn test_locate_single_archive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("release-2.7.4.tar.gz");
        fs::write(&path, vec![0u8; 2048]).unwrap();
        // Other extensions are ignored
        fs::write(temp.path().join("release.zip"), "x").unwrap();

        let found = locate_archive(temp.path(), 1024).unwrap();
        assert_eq!(found, path);
    }
}
