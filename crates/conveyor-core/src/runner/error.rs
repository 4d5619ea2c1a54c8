//! # Conveyor Runner Errors
//!
//! Errors raised by the external-collaborator implementations (source
//! control, tool environment, test runner, report renderer). A
//! [`RunnerError`] means the collaborator itself broke; test assertion
//! failures are reported through `TestSummary`, not through this type.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with status {code:?}: {detail}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("Test runner environment is broken (exit status {code:?}): {detail}")]
    RunnerBroken { code: Option<i32>, detail: String },

    #[error("I/O error during '{operation}' on '{path}': {source}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
