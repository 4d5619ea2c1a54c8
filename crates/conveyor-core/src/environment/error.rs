//! # Conveyor Environment Errors
//!
//! Defines error types raised while building the run-scoped environment
//! context, before any pipeline stage executes.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required secret: {name}")]
    MissingSecret { name: String },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Required path '{path}' is not writable: {source}")]
    UnwritablePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
