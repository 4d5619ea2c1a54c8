//! # Conveyor Dependency Cache Gate
//!
//! Decides whether dependency installation is necessary by comparing the
//! current dependency manifest against the last-installed snapshot. A fresh
//! install only occurs when the manifest differs byte-for-byte from the
//! snapshot, or no snapshot exists yet.
//!
//! The snapshot write is the cache-write step and must happen only after
//! the install succeeds: an install failure must not poison the cache with
//! a false "unchanged" signal on retry. [`DependencyCache::commit`]
//! replaces the snapshot atomically, which also keeps the cache in a
//! recoverable state when a run is cancelled mid-write.
pub mod error;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

pub use error::CacheError;

/// The manifest/snapshot pair guarding one installation environment.
#[derive(Debug, Clone)]
pub struct DependencyCache {
    manifest: PathBuf,
    snapshot: PathBuf,
}

impl DependencyCache {
    pub fn new(manifest: PathBuf, snapshot: PathBuf) -> Self {
        Self { manifest, snapshot }
    }

    /// True when an install is required: no snapshot exists, or the current
    /// manifest content differs from the snapshot.
    pub fn should_install(&self) -> Result<bool, CacheError> {
        if !self.snapshot.exists() {
            return Ok(true);
        }
        let current = fs::read(&self.manifest).map_err(|source| CacheError::ManifestUnreadable {
            path: self.manifest.clone(),
            source,
        })?;
        let baseline = fs::read(&self.snapshot).map_err(|source| CacheError::SnapshotUnreadable {
            path: self.snapshot.clone(),
            source,
        })?;
        Ok(current != baseline)
    }

    /// Overwrite the snapshot with the current manifest content.
    ///
    /// Called by the install stage only after a successful install. The
    /// replacement is atomic: the content is written to a temporary file in
    /// the snapshot's directory and persisted over the target.
    pub fn commit(&self) -> Result<(), CacheError> {
        let current = fs::read(&self.manifest).map_err(|source| CacheError::ManifestUnreadable {
            path: self.manifest.clone(),
            source,
        })?;

        let dir = self.snapshot.parent().unwrap_or_else(|| std::path::Path::new("."));
        let temp = NamedTempFile::new_in(dir).map_err(|source| CacheError::SnapshotWrite {
            path: self.snapshot.clone(),
            source,
        })?;
        temp.as_file().write_all(&current).map_err(|source| CacheError::SnapshotWrite {
            path: self.snapshot.clone(),
            source,
        })?;
        temp.persist(&self.snapshot).map_err(|e| CacheError::SnapshotWrite {
            path: self.snapshot.clone(),
            source: e.error,
        })?;

        log::debug!("Dependency snapshot updated: {}", self.snapshot.display());
        Ok(())
    }

    pub fn manifest(&self) -> &PathBuf {
        &self.manifest
    }

    pub fn snapshot(&self) -> &PathBuf {
        &self.snapshot
    }
}
