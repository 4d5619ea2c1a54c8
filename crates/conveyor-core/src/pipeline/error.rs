//! # Conveyor Pipeline Errors
//!
//! Defines error types specific to the stage orchestration engine. Stage
//! bodies return their own component errors boxed as
//! [`crate::pipeline::StageError`]; the variants here cover engine-level
//! failures and cross-stage state threading.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage required an identifier from an earlier stage that was
    /// skipped or failed.
    #[error("Stage '{stage_id}' requires identifier '{key}' from an earlier stage that did not run")]
    MissingIdentifier { stage_id: String, key: String },

    #[error("Error accessing data from StageContext: Key '{key}' - {reason}")]
    ContextError { key: String, reason: String },

    #[error("Another run is already active (lock file '{path}' exists)")]
    AlreadyRunning { path: PathBuf },

    #[error("Failed to acquire run lock '{path}': {source}")]
    LockFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
