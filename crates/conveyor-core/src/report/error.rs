//! # Conveyor Report Errors
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to scan report directory '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Report pair version skew for v{expected}: HTML at {html:?}, PDF at {pdf:?}"
    )]
    VersionMismatch {
        expected: u64,
        html: Option<u64>,
        pdf: Option<u64>,
    },

    #[error("Version file '{path}' is invalid: {reason}")]
    VersionFile { path: PathBuf, reason: String },
}
