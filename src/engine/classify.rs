// src/engine/classify.rs

//! Content classifier / filter
//!
//! Removes installed items that are disallowed for the current installation
//! variant. Matching is a case-insensitive prefix test against the
//! variant's denylist, applied to the immediate children of the managed
//! content directory only (one level, not recursive). First match suffices;
//! the result is the same regardless of pattern order.

use super::ReconcileResult;
use crate::error::Result;
use crate::fsutil;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Case-insensitive name-prefix denylist
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    patterns: Vec<String>,
}

impl Denylist {
    /// Build a denylist; patterns are stored lowercased
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// True when no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Case-insensitive prefix test against any pattern
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.patterns.iter().any(|p| lower.starts_with(p.as_str()))
    }
}

/// Remove denied entries from the managed content directory.
/// A missing content directory is a no-op.
pub fn prune_disallowed(
    root: &Path,
    content_dir: &Path,
    denylist: &Denylist,
    result: &mut ReconcileResult,
) -> Result<()> {
    if denylist.is_empty() {
        return Ok(());
    }

    let abs = root.join(content_dir);
    let entries = match fs::read_dir(&abs) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("content directory {} absent, skipping", content_dir.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if denylist.matches(&name.to_string_lossy()) {
            fsutil::remove_any(&entry.path())?;
            info!("removed disallowed entry {}", name.to_string_lossy());
            result.denied.push(content_dir.join(&name));
        }
    }

    Ok(())
}

/// Remove tree-relative paths that the variant never keeps.
/// Missing paths are skipped silently.
pub fn discard_paths(root: &Path, discard: &[String], result: &mut ReconcileResult) -> Result<()> {
    for rel in discard {
        let abs = root.join(rel);
        if fs::symlink_metadata(&abs).is_ok() {
            fsutil::remove_any(&abs)?;
            info!("discarded {}", rel);
            result.removed.push(rel.into());
        } else {
            debug!("discard path {} absent, skipping", rel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_denylist_prefix_matching() {
        let denylist = Denylist::new(["OptiFine", "journeymap-"]);
        assert!(denylist.matches("OptiFine_1.7.10_HD.jar"));
        assert!(denylist.matches("optifine-lite.jar"));
        assert!(denylist.matches("JourneyMap-5.1.jar"));
        // Prefix, not substring-in-middle
        assert!(!denylist.matches("Not-OptiFine.jar"));
        assert!(!denylist.matches("journeymap.jar"));
    }

    #[test]
    fn test_prune_disallowed() {
        let temp = TempDir::new().unwrap();
        let mods = temp.path().join("mods");
        fs::create_dir(&mods).unwrap();
        fs::write(mods.join("OptiFine-1.2.jar"), "x").unwrap();
        fs::write(mods.join("fastcraft-lite.jar"), "x").unwrap();
        fs::write(mods.join("BuildCraft.jar"), "x").unwrap();

        let denylist = Denylist::new(["OptiFine", "FastCraft"]);
        let mut result = ReconcileResult::default();
        prune_disallowed(temp.path(), Path::new("mods"), &denylist, &mut result).unwrap();

        assert!(!mods.join("OptiFine-1.2.jar").exists());
        assert!(!mods.join("fastcraft-lite.jar").exists());
        assert!(mods.join("BuildCraft.jar").exists());
        assert_eq!(result.denied.len(), 2);
    }

    #[test]
    fn test_prune_is_one_level_only() {
        let temp = TempDir::new().unwrap();
        let mods = temp.path().join("mods");
        fs::create_dir_all(mods.join("1.7.10")).unwrap();
        fs::write(mods.join("1.7.10/OptiFine.jar"), "x").unwrap();

        let denylist = Denylist::new(["OptiFine"]);
        let mut result = ReconcileResult::default();
        prune_disallowed(temp.path(), Path::new("mods"), &denylist, &mut result).unwrap();

        // Nested entries are not classified
        assert!(mods.join("1.7.10/OptiFine.jar").exists());
        assert!(result.denied.is_empty());
    }

    #[test]
    fn test_denied_directory_removed_recursively() {
        let temp = TempDir::new().unwrap();
        let mods = temp.path().join("mods");
        fs::create_dir_all(mods.join("journeymap-data/cache")).unwrap();
        fs::write(mods.join("journeymap-data/cache/tile.png"), "x").unwrap();

        let denylist = Denylist::new(["journeymap-"]);
        let mut result = ReconcileResult::default();
        prune_disallowed(temp.path(), Path::new("mods"), &denylist, &mut result).unwrap();

        assert!(!mods.join("journeymap-data").exists());
    }

    #[test]
    fn test_missing_content_dir_is_noop() {
        let temp = TempDir::new().unwrap();
        let denylist = Denylist::new(["OptiFine"]);
        let mut result = ReconcileResult::default();
        prune_disallowed(temp.path(), Path::new("mods"), &denylist, &mut result).unwrap();
        assert!(result.denied.is_empty());
    }

    #[test]
    fn test_discard_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("README.md"), "x").unwrap();
        fs::create_dir(temp.path().join("resourcepacks")).unwrap();

        let discard = vec![
            "README.md".to_string(),
            "resourcepacks".to_string(),
            "resources".to_string(),
        ];
        let mut result = ReconcileResult::default();
        discard_paths(temp.path(), &discard, &mut result).unwrap();

        assert!(!temp.path().join("README.md").exists());
        assert!(!temp.path().join("resourcepacks").exists());
        // "resources" was absent and silently skipped
        assert_eq!(result.removed.len(), 2);
        assert!(result.removed.contains(&PathBuf::from("README.md")));
    }
}
