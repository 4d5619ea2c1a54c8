//! Global run exclusion.
//!
//! Only one pipeline run may be active at a time: the dependency cache,
//! the persistent installation environment and the report directory are
//! shared filesystem state with no per-run isolation. A second run is
//! rejected while the lock file exists.
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::error::PipelineError;

/// Exclusive filesystem run lock, released on drop.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock by creating the lock file. Fails with
    /// [`PipelineError::AlreadyRunning`] when another run holds it.
    pub fn acquire(path: PathBuf) -> Result<Self, PipelineError> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(source) = write!(file, "{}", std::process::id()) {
                    // Do not leave a half-written lock behind
                    let _ = fs::remove_file(&path);
                    return Err(PipelineError::LockFailed { path, source });
                }
                log::debug!("Run lock acquired: {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(PipelineError::AlreadyRunning { path })
            }
            Err(source) => Err(PipelineError::LockFailed { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove run lock '{}': {}", self.path.display(), e);
        }
    }
}
