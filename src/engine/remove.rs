// src/engine/remove.rs

//! Stale-content remover
//!
//! Deletes the managed subset of the installation tree that the release
//! archive is expected to replace. Protected entries survive at any depth:
//! removing a directory walks it and deletes only unprotected content, so a
//! directory that still holds a protected descendant is pruned rather than
//! removed. Missing managed paths are skipped silently so a partially
//! reconciled tree can be re-run.

use super::protect::ProtectedPaths;
use super::ReconcileResult;
use crate::error::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Remove every unprotected managed path under the tree root.
///
/// Top-level managed directories are pruned, never deleted themselves;
/// managed files and symlinks are deleted outright.
pub fn remove_managed(
    root: &Path,
    managed: &[String],
    protected: &ProtectedPaths,
    result: &mut ReconcileResult,
) -> Result<()> {
    for name in managed {
        let rel = Path::new(name);
        let abs = root.join(rel);

        let meta = match fs::symlink_metadata(&abs) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("managed path {} absent, skipping", rel.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if protected.is_protected(rel) {
            debug!("managed path {} is protected, skipping", rel.display());
            continue;
        }

        if meta.is_dir() {
            prune_children(&abs, rel, protected, result)?;
        } else {
            fs::remove_file(&abs)?;
            info!("removed {}", rel.display());
            result.removed.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// Delete the unprotected immediate children of a managed directory.
/// The directory itself always survives.
fn prune_children(
    abs: &Path,
    rel: &Path,
    protected: &ProtectedPaths,
    result: &mut ReconcileResult,
) -> Result<()> {
    for entry in fs::read_dir(abs)? {
        let entry = entry?;
        let child_rel = rel.join(entry.file_name());

        if protected.is_protected(&child_rel) {
            debug!("keeping protected {}", child_rel.display());
            continue;
        }

        if entry.file_type()?.is_dir() {
            remove_guarded(&entry.path(), &child_rel, protected, result)?;
        } else {
            fs::remove_file(entry.path())?;
            result.removed.push(child_rel);
        }
    }
    Ok(())
}

/// Recursively delete a directory while keeping protected descendants.
/// Returns true when the directory was fully removed.
fn remove_guarded(
    abs: &Path,
    rel: &Path,
    protected: &ProtectedPaths,
    result: &mut ReconcileResult,
) -> Result<bool> {
    let mut kept_any = false;

    for entry in fs::read_dir(abs)? {
        let entry = entry?;
        let child_rel = rel.join(entry.file_name());

        if protected.is_protected(&child_rel) {
            debug!("keeping protected {}", child_rel.display());
            kept_any = true;
            continue;
        }

        if entry.file_type()?.is_dir() {
            if !remove_guarded(&entry.path(), &child_rel, protected, result)? {
                kept_any = true;
            }
        } else {
            fs::remove_file(entry.path())?;
            result.removed.push(child_rel);
        }
    }

    if kept_any {
        Ok(false)
    } else {
        fs::remove_dir(abs)?;
        result.removed.push(rel.to_path_buf());
        Ok(true)
    }
}
