// src/engine/overlay.rs

//! Overlay merger
//!
//! Layers externally supplied directories (additional content, optional
//! feature bundles, alternate-runtime patch sets) into the installation
//! tree after extraction. Conflict resolution is existence-based and the
//! destination always wins.
//!
//! Two merge modes:
//! - `move-and-prune`: top-level entries are moved into the destination,
//!   then the overlay source directory is deleted, plus one level of
//!   empty-parent pruning.
//! - `copy-preserve`: the source tree is recursively copied into the
//!   destination without deleting the source.
//!
//! A classifier attached to an overlay routes each top-level entry to the
//! destination bound to the first matching route; unmatched entries go to
//! the default destination.

use super::ReconcileResult;
use crate::error::Result;
use crate::fsutil;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How an overlay's content is transferred into the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Transfer top-level entries, then delete the overlay source
    MoveAndPrune,
    /// Recursively copy into the destination, keeping the source
    CopyPreserve,
}

/// One classification route: entries matching the predicate go to `dest`
#[derive(Debug, Clone)]
pub struct ClassifierRoute {
    /// Case-insensitive name prefix to match, if any
    pub prefix: Option<String>,
    /// Match entries that look like an options/settings file. Such entries
    /// also purge a stale same-named file at the default destination.
    pub settings_file: bool,
    /// Destination directory within the tree, relative to the root
    pub dest: PathBuf,
}

impl ClassifierRoute {
    fn matches(&self, name: &str) -> bool {
        if let Some(prefix) = &self.prefix {
            if name.to_lowercase().starts_with(&prefix.to_lowercase()) {
                return true;
            }
        }
        self.settings_file && is_settings_file(name)
    }
}

/// Routes overlay entries by name; first matching route wins
#[derive(Debug, Clone)]
pub struct OverlayClassifier {
    pub routes: Vec<ClassifierRoute>,
    /// Where unmatched entries land
    pub default_dest: PathBuf,
}

impl OverlayClassifier {
    /// Pick the destination for an entry name. The second value is true
    /// when a stale copy at the default destination must be purged first.
    fn route(&self, name: &str) -> (&Path, bool) {
        for route in &self.routes {
            if route.matches(name) {
                return (&route.dest, route.settings_file);
            }
        }
        (&self.default_dest, false)
    }
}

/// True for names like `optionsshaders.txt` that carry user settings
fn is_settings_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with("options") && lower.ends_with(".txt")
}

/// An overlay directory to merge into the tree
#[derive(Debug, Clone)]
pub struct Overlay {
    /// External source directory (absolute)
    pub source: PathBuf,
    /// Destination within the tree, relative to the root
    pub dest: PathBuf,
    pub mode: MergeMode,
    pub classifier: Option<OverlayClassifier>,
}

/// Merge one overlay into the tree. A missing source directory is a no-op.
pub fn merge_overlay(overlay: &Overlay, root: &Path, result: &mut ReconcileResult) -> Result<()> {
    match fs::symlink_metadata(&overlay.source) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("no overlay at {}, skipping", overlay.source.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    match overlay.mode {
        MergeMode::MoveAndPrune => move_and_prune(overlay, root, result),
        MergeMode::CopyPreserve => {
            let dest_abs = root.join(&overlay.dest);
            copy_preserve(&overlay.source, &dest_abs, &overlay.dest, result)
        }
    }
}

fn move_and_prune(overlay: &Overlay, root: &Path, result: &mut ReconcileResult) -> Result<()> {
    for entry in fs::read_dir(&overlay.source)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        let (dest_rel, purge_stale) = match &overlay.classifier {
            Some(classifier) => classifier.route(&name_str),
            None => (overlay.dest.as_path(), false),
        };

        let dest_dir = root.join(dest_rel);
        fs::create_dir_all(&dest_dir)?;
        let target = dest_dir.join(&name);

        if fs::symlink_metadata(&target).is_ok() {
            debug!(
                "{} already present at {}, keeping existing copy",
                name_str,
                dest_rel.display()
            );
            result.skipped.push(rel_join(dest_rel, &name));
            continue;
        }

        if purge_stale {
            if let Some(classifier) = &overlay.classifier {
                let stale = root.join(&classifier.default_dest).join(&name);
                if fs::symlink_metadata(&stale).is_ok() {
                    debug!("purging stale settings copy {}", stale.display());
                    fsutil::remove_any(&stale)?;
                    result.removed.push(rel_join(&classifier.default_dest, &name));
                }
            }
        }

        fsutil::move_entry(&entry.path(), &target)?;
        result.merged.push(rel_join(dest_rel, &name));
    }

    fs::remove_dir_all(&overlay.source)?;
    info!("consumed overlay {}", overlay.source.display());

    // One level of empty-ancestor pruning, not recursive upward
    if let Some(parent) = overlay.source.parent() {
        if fsutil::is_empty_dir(parent) {
            fs::remove_dir(parent)?;
        }
    }

    Ok(())
}

/// Recursive merge without deleting the source; existing destination files win.
fn copy_preserve(
    src: &Path,
    dest_abs: &Path,
    dest_rel: &Path,
    result: &mut ReconcileResult,
) -> Result<()> {
    fs::create_dir_all(dest_abs)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let child_abs = dest_abs.join(&name);
        let child_rel = rel_join(dest_rel, &name);

        if entry.file_type()?.is_dir() {
            copy_preserve(&entry.path(), &child_abs, &child_rel, result)?;
        } else if fs::symlink_metadata(&child_abs).is_ok() {
            debug!("keeping existing {}", child_rel.display());
            result.skipped.push(child_rel);
        } else {
            fs::copy(entry.path(), &child_abs)?;
            result.merged.push(child_rel);
        }
    }

    Ok(())
}

/// Join a tree-relative destination and an entry name, flattening `.`
fn rel_join(base: &Path, name: &OsStr) -> PathBuf {
    if base == Path::new(".") {
        PathBuf::from(name)
    } else {
        base.join(name)
    }
}
