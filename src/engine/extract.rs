// src/engine/extract.rs

//! Non-destructive extractor
//!
//! Unpacks the release archive into the installation tree without ever
//! overwriting an existing filesystem object. An entry whose destination
//! already exists is counted as skipped, not as an error, which makes
//! extraction idempotent: re-running after a partial or repeated run never
//! clobbers anything already materialized, whether that came from a prior
//! extraction, a protected config, or user-added content.

use super::ReconcileResult;
use crate::archive::ArchivePackage;
use crate::error::{Error, Result};
use crate::paths::sanitize_rel_path;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Extract every archive entry whose destination does not exist yet.
///
/// Directory entries are materialized as needed but not counted; only file
/// and symlink entries contribute to the extracted/skipped totals.
pub fn extract_into(
    archive: &ArchivePackage,
    root: &Path,
    result: &mut ReconcileResult,
) -> Result<()> {
    let mut reader = archive.reader()?;
    let entries = reader.entries().map_err(|e| {
        Error::ArchiveError(format!("cannot read {}: {}", archive.path().display(), e))
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| {
            Error::ArchiveError(format!("corrupt entry in {}: {}", archive.path().display(), e))
        })?;

        let raw_path = entry.path().map_err(|e| {
            Error::ArchiveError(format!("unreadable entry path: {}", e))
        })?;
        let rel = sanitize_rel_path(&*raw_path)?;
        drop(raw_path);
        let dest = root.join(&rel);

        if entry.header().entry_type().is_dir() {
            if fs::symlink_metadata(&dest).is_err() {
                fs::create_dir_all(&dest)?;
            }
            continue;
        }

        // The central non-destructive check: anything already on disk wins,
        // including dangling symlinks.
        if fs::symlink_metadata(&dest).is_ok() {
            debug!("skipping existing {}", rel.display());
            result.skipped.push(rel);
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&dest).map_err(|e| {
            Error::ArchiveError(format!("failed to extract {}: {}", rel.display(), e))
        })?;
        result.extracted.push(rel);
    }

    Ok(())
}
