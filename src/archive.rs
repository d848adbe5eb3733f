// src/archive.rs

//! Release archive access
//!
//! `ArchivePackage` wraps a gzip-compressed tar release archive. The
//! container exposes an ordered walk over its entries, each addressed by a
//! normalized relative path, and supports extracting a single entry to an
//! arbitrary destination. The backing file is deleted as a cleanup step
//! once extraction has completed without a fatal error.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

/// Gzip magic bytes (first two bytes of any .tar.gz)
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// An opened, read-only release archive
pub struct ArchivePackage {
    path: PathBuf,
}

impl ArchivePackage {
    /// Open a release archive, validating the gzip magic bytes up front so
    /// that a corrupt or mislabeled file aborts the run before any deletion
    /// has taken place.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = File::open(&path)
            .map_err(|e| Error::ArchiveError(format!("cannot open {}: {}", path.display(), e)))?;

        let mut magic = [0u8; 2];
        file.read_exact(&mut magic).map_err(|e| {
            Error::ArchiveError(format!("cannot read {}: {}", path.display(), e))
        })?;
        if magic != GZIP_MAGIC {
            return Err(Error::ArchiveError(format!(
                "{} is not a gzip-compressed archive",
                path.display()
            )));
        }

        debug!("opened release archive {}", path.display());
        Ok(Self { path })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a streaming walk over the archive entries
    pub(crate) fn reader(&self) -> Result<Archive<GzDecoder<File>>> {
        let file = File::open(&self.path)
            .map_err(|e| Error::ArchiveError(format!("cannot open {}: {}", self.path.display(), e)))?;
        Ok(Archive::new(GzDecoder::new(file)))
    }

    /// Delete the backing file. Called after extraction has finished.
    pub fn cleanup(self) -> Result<()> {
        fs::remove_file(&self.path)?;
        info!("removed release archive {}", self.path.display());
        Ok(())
    }
}
