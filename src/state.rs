// src/state.rs

//! Path and preference persistence
//!
//! A small key-value store remembering where each installation variant
//! lives and which optional bundles the user wants. Backed by a TOML map
//! so the file stays hand-editable. A missing file is an empty store.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default state file name, kept next to the staged release content
const STATE_FILE_NAME: &str = "packsync.toml";

/// Persistent key-value store with a get/set contract
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl StateFile {
    /// Load the store at `path`; a missing file yields an empty store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                Error::ParseError(format!("invalid state file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no state file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    /// Where this store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a yes/no value. Unrecognized values read as unset.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(true),
            "n" | "no" | "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Set a value in memory; call [`StateFile::save`] to persist
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Forget a key, e.g. a stored path that turned out to be invalid
    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Write the whole map back to disk
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string(&self.values)
            .map_err(|e| Error::ParseError(format!("cannot serialize state: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Default location: next to the staged release content when a base
    /// directory is known, otherwise under the user's config directory.
    pub fn default_path(base_dir: Option<&Path>) -> PathBuf {
        match base_dir {
            Some(base) => base.join(STATE_FILE_NAME),
            None => dirs::config_dir()
                .map(|dir| dir.join("packsync").join(STATE_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME)),
        }
    }
}
