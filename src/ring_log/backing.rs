//! Backing file mirror
//!
//! Keeps a single file on disk whose content equals the live log
//! snapshot. The file is rewritten after every append and removed when
//! the log is released.

use std::path::{Path, PathBuf};

use crate::types::RingResult;
use crate::utils::{atomic_write, remove_if_exists};

/// Single-file mirror of the live log content
#[derive(Debug, Clone)]
pub struct BackingFile {
    path: PathBuf,
}

impl BackingFile {
    /// Create a mirror at `path`, discarding any stale content left there
    pub fn create<P: AsRef<Path>>(path: P) -> RingResult<Self> {
        let path = path.as_ref().to_path_buf();
        if remove_if_exists(&path)? {
            tracing::info!(path = %path.display(), "removed stale backing file");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file content with `snapshot`
    pub fn persist(&self, snapshot: &[u8]) -> RingResult<()> {
        atomic_write(&self.path, snapshot)?;
        Ok(())
    }

    /// Delete the file
    pub fn remove(&self) -> RingResult<()> {
        remove_if_exists(&self.path)?;
        Ok(())
    }
}
