// src/paths.rs

//! Path sanitization for untrusted archive entries
//!
//! Release archives are produced by third parties; an entry path like
//! `../../etc/passwd` must never resolve outside the installation tree.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize a relative path taken from an archive entry or overlay name.
///
/// Rejects `..` components, skips `.`, strips leading separators and
/// Windows prefixes, and rejects paths that are empty after normalization.
/// Separators are normalized to the host convention by the `Path`
/// component walk itself.
pub fn sanitize_rel_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    // Strip leading slashes so absolute entry names become tree-relative
    let relative = path_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::PathTraversal(path_str.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(
            "empty path after normalization".to_string(),
        ));
    }

    Ok(normalized)
}
