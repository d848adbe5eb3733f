// src/fsutil.rs

//! Filesystem helpers shared by the engine stages.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Remove a path whatever it is: files and symlinks directly, directories
/// recursively. A missing path is a no-op.
pub fn remove_any(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("already removed: {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Move a directory entry, falling back to copy+fsync+delete when source
/// and destination are on different filesystems (EXDEV).
pub fn move_entry(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            debug!(
                "cross-filesystem move detected ({} -> {}), using copy fallback",
                src.display(),
                dst.display()
            );

            let meta = fs::symlink_metadata(src)?;
            if meta.is_dir() {
                copy_tree(src, dst)?;
                fs::remove_dir_all(src)?;
            } else {
                fs::copy(src, dst)?;

                // fsync the destination before removing the source
                let file = File::open(dst)?;
                file.sync_all()?;
                drop(file);

                fs::remove_file(src)?;
            }
            Ok(())
        }
        Err(e) => Err(Error::IoError(format!(
            "failed to move {} to {}: {}",
            src.display(),
            dst.display(),
            e
        ))),
    }
}

/// Recursively copy a directory tree to a destination that does not exist yet.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// True when the directory exists and holds no entries.
pub fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
