//! # Conveyor Publisher Errors
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP request to {target} failed: {source}")]
    Http {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    /// 4xx-class rejection (authentication, permissions, validation).
    /// Never retried; surfaced immediately.
    #[error("{target} rejected the request ({status}): {body}")]
    Rejected { target: String, status: u16, body: String },

    #[error("{target} returned an unexpected response: {reason}")]
    UnexpectedResponse { target: String, reason: String },

    #[error("Failed to read attachment '{path}': {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Mail delivery failed: {0}")]
    Smtp(String),
}

/// A downstream target reported non-success for a publish stage. Carried as
/// the stage error so the executor records the failed outcome.
#[derive(Debug, Error)]
#[error("Publish to {target} failed: {detail}")]
pub struct PublishFailure {
    pub target: String,
    pub detail: String,
}
