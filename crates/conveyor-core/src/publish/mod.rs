//! # Conveyor Publisher Adapters
//!
//! One adapter per downstream system (wiki, test tracker, issue tracker,
//! mailer), each exposing the uniform
//! `publish(RunContext, Artifact) -> PublishOutcome` contract. Adapters own
//! their retry policy for transient network errors; authentication and
//! validation errors (4xx-class) are surfaced immediately as a failed
//! outcome.
//!
//! The issue-tracker adapter has a two-step protocol modeled by
//! [`ExecutionTracker`]: create-execution returns an opaque execution
//! identifier that is persisted for the remainder of the run and threaded
//! into the attach-reports call.
pub mod confluence;
pub mod error;
pub mod jira;
pub mod mail;
pub mod retry;
pub mod rtm;

use async_trait::async_trait;

use crate::archive::ArchiveArtifact;
use crate::environment::RunContext;
use crate::report::ReportArtifact;
use crate::runner::TestSummary;

pub use confluence::ConfluencePublisher;
pub use error::{PublishError, PublishFailure};
pub use jira::JiraTracker;
pub use mail::MailPublisher;
pub use retry::RetryPolicy;
pub use rtm::RtmPublisher;

/// Input to a publisher adapter.
#[derive(Debug, Clone)]
pub enum Artifact {
    Report(ReportArtifact),
    Archive(ArchiveArtifact),
    Notice(RunNotice),
}

impl Artifact {
    /// Short label used in mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Artifact::Report(_) => "report",
            Artifact::Archive(_) => "archive",
            Artifact::Notice(_) => "notice",
        }
    }
}

/// Bundle published by the mail adapter: the report pair, the run's test
/// summary and the downstream links collected during the run.
#[derive(Debug, Clone)]
pub struct RunNotice {
    pub report: ReportArtifact,
    pub summary: TestSummary,
    pub wiki_url: Option<String>,
    pub execution_url: Option<String>,
}

/// Result of one publish call, consumed by the executor to decide fatal
/// vs. recoverable handling per stage.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub target: String,
    pub success: bool,
    pub detail: String,
}

impl PublishOutcome {
    pub fn succeeded(target: &str, detail: impl Into<String>) -> Self {
        Self { target: target.to_string(), success: true, detail: detail.into() }
    }

    pub fn failed(target: &str, detail: impl Into<String>) -> Self {
        Self { target: target.to_string(), success: false, detail: detail.into() }
    }

    /// Convert a non-success outcome into a stage error.
    pub fn into_result(self) -> Result<PublishOutcome, PublishFailure> {
        if self.success {
            Ok(self)
        } else {
            Err(PublishFailure { target: self.target, detail: self.detail })
        }
    }
}

/// Integration boundary to a specific downstream system.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn target(&self) -> &str;

    async fn publish(&self, run: &RunContext, artifact: &Artifact) -> PublishOutcome;
}

/// Two-step issue-tracker protocol.
#[async_trait]
pub trait ExecutionTracker: Send + Sync {
    /// Step (a): create a test-execution issue, returning its opaque key.
    async fn create_execution(&self, run: &RunContext) -> Result<String, PublishError>;

    /// Step (b): attach the report pair to the execution created in (a).
    async fn attach_reports(
        &self,
        run: &RunContext,
        execution_key: &str,
        report: &ReportArtifact,
    ) -> PublishOutcome;
}
