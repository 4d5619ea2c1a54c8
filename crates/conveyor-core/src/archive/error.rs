//! # Conveyor Archiver Errors
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive source '{path}' does not exist or is not a directory")]
    SourceMissing { path: PathBuf },

    #[error("Archive source '{path}' contains no files")]
    SourceEmpty { path: PathBuf },

    #[error("I/O error during '{operation}' on '{path}': {source}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Zip error while writing '{path}': {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}
