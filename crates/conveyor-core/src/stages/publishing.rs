//! Publishing stages: the bridge between the stage graph and the
//! downstream publisher adapters. Each stage pulls its input artifact from
//! the shared-data map, invokes one adapter and converts a non-success
//! outcome into a stage error so the executor can apply the stage's
//! failure policy.
use std::sync::Arc;

use async_trait::async_trait;

use crate::archive::ArchiveArtifact;
use crate::pipeline::{PipelineError, Stage, StageContext, StageError};
use crate::publish::{Artifact, ExecutionTracker, Publisher, RunNotice};
use crate::report::ReportArtifact;
use crate::runner::TestSummary;

use super::{
    ARCHIVE_ARTIFACT_KEY, EXECUTION_KEY, EXECUTION_URL_KEY, REPORT_ARTIFACT_KEY,
    TEST_SUMMARY_KEY, WIKI_URL_KEY,
};

fn required_report(context: &StageContext, stage_id: &str) -> Result<ReportArtifact, StageError> {
    context
        .get_data::<ReportArtifact>(REPORT_ARTIFACT_KEY)
        .cloned()
        .ok_or_else(|| {
            PipelineError::ContextError {
                key: REPORT_ARTIFACT_KEY.to_string(),
                reason: format!("no report artifact available to stage '{}'", stage_id),
            }
            .into()
        })
}

/// Publishes the report pair to the wiki and records the page URL for the
/// email notification.
pub struct WikiPublishStage {
    publisher: Arc<dyn Publisher>,
}

impl WikiPublishStage {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Stage for WikiPublishStage {
    fn id(&self) -> &str {
        "publish.wiki"
    }

    fn name(&self) -> &str {
        "Wiki Publish"
    }

    fn description(&self) -> &str {
        "Publishes the report pair as a wiki page with attachments"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let report = required_report(context, self.id())?;
        let run = context.run_arc();
        let outcome = self.publisher.publish(&run, &Artifact::Report(report)).await;
        let outcome = outcome.into_result()?;
        context.set_data(WIKI_URL_KEY, outcome.detail);
        Ok(())
    }
}

/// Uploads the results archive to the test tracker. Gated upstream on a
/// non-empty test-execution key.
pub struct TrackerUploadStage {
    publisher: Arc<dyn Publisher>,
}

impl TrackerUploadStage {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Stage for TrackerUploadStage {
    fn id(&self) -> &str {
        "publish.tracker_upload"
    }

    fn name(&self) -> &str {
        "Tracker Upload"
    }

    fn description(&self) -> &str {
        "Uploads the results archive to the test tracker"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let archive = context
            .get_data::<ArchiveArtifact>(ARCHIVE_ARTIFACT_KEY)
            .cloned()
            .ok_or_else(|| PipelineError::ContextError {
                key: ARCHIVE_ARTIFACT_KEY.to_string(),
                reason: "no archive artifact available for the tracker upload".to_string(),
            })?;
        let run = context.run_arc();
        self.publisher
            .publish(&run, &Artifact::Archive(archive))
            .await
            .into_result()?;
        Ok(())
    }
}

/// Step (a) of the issue-tracker protocol: create the execution issue and
/// persist its key and browse URL in the run.
pub struct ExecutionCreateStage {
    tracker: Arc<dyn ExecutionTracker>,
}

impl ExecutionCreateStage {
    pub fn new(tracker: Arc<dyn ExecutionTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Stage for ExecutionCreateStage {
    fn id(&self) -> &str {
        "publish.execution_create"
    }

    fn name(&self) -> &str {
        "Execution Create"
    }

    fn description(&self) -> &str {
        "Creates the test-execution issue in the issue tracker"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let run = context.run_arc();
        let key = self.tracker.create_execution(&run).await?;
        log::info!("Created test execution issue: {}", key);

        let browse_url = format!("{}/browse/{}", run.issues.credentials.base_url, key);
        context.set_data(EXECUTION_KEY, key);
        context.set_data(EXECUTION_URL_KEY, browse_url);
        Ok(())
    }
}

/// Step (b): attach the report pair to the execution issue created in (a).
///
/// Requires the execution key from the context; its absence means step (a)
/// never succeeded and the reports would be lost, so this stage fails with
/// [`PipelineError::MissingIdentifier`] rather than publishing nowhere.
pub struct AttachReportsStage {
    tracker: Arc<dyn ExecutionTracker>,
}

impl AttachReportsStage {
    pub fn new(tracker: Arc<dyn ExecutionTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Stage for AttachReportsStage {
    fn id(&self) -> &str {
        "publish.attach_reports"
    }

    fn name(&self) -> &str {
        "Attach Reports"
    }

    fn description(&self) -> &str {
        "Attaches the report pair to the test-execution issue"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let key = context
            .get_data::<String>(EXECUTION_KEY)
            .cloned()
            .ok_or_else(|| PipelineError::MissingIdentifier {
                stage_id: self.id().to_string(),
                key: EXECUTION_KEY.to_string(),
            })?;
        let report = required_report(context, self.id())?;
        let run = context.run_arc();
        self.tracker
            .attach_reports(&run, &key, &report)
            .await
            .into_result()?;
        Ok(())
    }
}

/// Sends the notification email carrying the summary, the collected links
/// and the report pair as attachments.
pub struct EmailStage {
    publisher: Arc<dyn Publisher>,
}

impl EmailStage {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Stage for EmailStage {
    fn id(&self) -> &str {
        "publish.email"
    }

    fn name(&self) -> &str {
        "Email Notification"
    }

    fn description(&self) -> &str {
        "Mails the run summary and report pair to the recipient lists"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let report = required_report(context, self.id())?;
        let summary = context
            .get_data::<TestSummary>(TEST_SUMMARY_KEY)
            .copied()
            .unwrap_or_default();
        let notice = RunNotice {
            report,
            summary,
            wiki_url: context.get_data::<String>(WIKI_URL_KEY).cloned(),
            execution_url: context.get_data::<String>(EXECUTION_URL_KEY).cloned(),
        };
        let run = context.run_arc();
        self.publisher
            .publish(&run, &Artifact::Notice(notice))
            .await
            .into_result()?;
        Ok(())
    }
}
