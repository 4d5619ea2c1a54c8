//! # Conveyor Built-in Stages
//!
//! The concrete stages of the build/test/report/publish pipeline, plus
//! [`build_pipeline`] assembling them in their fixed order. Each stage
//! delegates its heavy work to a collaborator trait and communicates with
//! later stages only through the context's shared-data map, under the keys
//! defined here.
pub mod publishing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::archive;
use crate::cache::DependencyCache;
use crate::pipeline::{
    FailurePolicy, Pipeline, PipelineBuilder, Stage, StageContext, StageEntry, StageError,
};
use crate::publish::{ExecutionTracker, Publisher};
use crate::report::{self, ReportArtifact};
use crate::runner::{ReportRenderer, SourceControl, TestRunner, ToolEnvironment};

pub use publishing::{
    AttachReportsStage, EmailStage, ExecutionCreateStage, TrackerUploadStage, WikiPublishStage,
};

/// Context key holding the [`crate::runner::TestSummary`] of the run.
pub const TEST_SUMMARY_KEY: &str = "test.summary";
/// Context key holding the produced [`ReportArtifact`].
pub const REPORT_ARTIFACT_KEY: &str = "report.artifact";
/// Context key holding the produced [`ArchiveArtifact`].
pub const ARCHIVE_ARTIFACT_KEY: &str = "archive.artifact";
/// Context key holding the execution issue key returned by the tracker.
pub const EXECUTION_KEY: &str = "execution.key";
/// Context key holding the published wiki page URL.
pub const WIKI_URL_KEY: &str = "wiki.url";
/// Context key holding the browse URL of the execution issue.
pub const EXECUTION_URL_KEY: &str = "execution.url";

/// Brings the working copy up to date via [`SourceControl`].
pub struct CheckoutStage {
    scm: Arc<dyn SourceControl>,
}

impl CheckoutStage {
    pub fn new(scm: Arc<dyn SourceControl>) -> Self {
        Self { scm }
    }
}

#[async_trait]
impl Stage for CheckoutStage {
    fn id(&self) -> &str {
        "pipeline.checkout"
    }

    fn name(&self) -> &str {
        "Source Checkout"
    }

    fn description(&self) -> &str {
        "Syncs the working copy before the pipeline operates on it"
    }

    async fn execute(&self, _context: &mut StageContext) -> Result<(), StageError> {
        self.scm.sync().await?;
        Ok(())
    }

    fn dry_run_description(&self, context: &StageContext) -> String {
        format!("Would sync working copy at {}", context.run().paths.workdir.display())
    }
}

/// Ensures the persistent installation environment exists.
pub struct EnvSetupStage {
    env: Arc<dyn ToolEnvironment>,
}

impl EnvSetupStage {
    pub fn new(env: Arc<dyn ToolEnvironment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Stage for EnvSetupStage {
    fn id(&self) -> &str {
        "pipeline.env_setup"
    }

    fn name(&self) -> &str {
        "Environment Setup"
    }

    fn description(&self) -> &str {
        "Creates the installation environment if it does not exist yet"
    }

    async fn execute(&self, _context: &mut StageContext) -> Result<(), StageError> {
        self.env.prepare().await?;
        Ok(())
    }
}

/// Installs dependencies only when the manifest changed since
/// the last successful install. The snapshot is committed after the install
/// succeeds, never before.
pub struct DependencyInstallStage {
    env: Arc<dyn ToolEnvironment>,
}

impl DependencyInstallStage {
    pub fn new(env: Arc<dyn ToolEnvironment>) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Stage for DependencyInstallStage {
    fn id(&self) -> &str {
        "pipeline.dependency_install"
    }

    fn name(&self) -> &str {
        "Dependency Install"
    }

    fn description(&self) -> &str {
        "Installs manifest packages, gated by the dependency cache"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let paths = &context.run().paths;
        let cache = DependencyCache::new(paths.manifest.clone(), paths.snapshot.clone());

        if !cache.should_install()? {
            log::info!("Dependency manifest unchanged, install not required");
            return Ok(());
        }

        self.env.install(&paths.manifest).await?;
        cache.commit()?;
        Ok(())
    }

    fn dry_run_description(&self, context: &StageContext) -> String {
        format!(
            "Would install packages from {} if changed",
            context.run().paths.manifest.display()
        )
    }
}

/// Runs the test suite and records its [`crate::runner::TestSummary`].
///
/// Test failures do not fail this stage: the pipeline's purpose is to
/// publish results either way. Only a broken runner is an error.
pub struct TestRunStage {
    runner: Arc<dyn TestRunner>,
}

impl TestRunStage {
    pub fn new(runner: Arc<dyn TestRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Stage for TestRunStage {
    fn id(&self) -> &str {
        "pipeline.test_run"
    }

    fn name(&self) -> &str {
        "Test Execution"
    }

    fn description(&self) -> &str {
        "Runs the test suite and captures the result counts"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let summary = self.runner.run().await?;
        log::info!("Test run complete: {}", summary);
        context.set_data(TEST_SUMMARY_KEY, summary);
        Ok(())
    }
}

/// Computes the next report version, invokes the renderer and validates
/// the produced pair before exposing it to the publishing stages.
pub struct ReportStage {
    renderer: Arc<dyn ReportRenderer>,
}

impl ReportStage {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Stage for ReportStage {
    fn id(&self) -> &str {
        "pipeline.report"
    }

    fn name(&self) -> &str {
        "Report Generation"
    }

    fn description(&self) -> &str {
        "Renders the version-stamped HTML/PDF report pair"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let report_dir = context.run().paths.report_dir.clone();
        let version = report::next_version(&report_dir)?;
        log::info!("Rendering report version {}", version);

        self.renderer.render(version).await?;

        let artifact = ReportArtifact::expect_pair(&report_dir, version)?;
        report::verify_version_file(&report_dir, version)?;
        context.set_data(REPORT_ARTIFACT_KEY, artifact);
        Ok(())
    }

    fn dry_run_description(&self, context: &StageContext) -> String {
        let next = report::next_version(&context.run().paths.report_dir)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "?".to_string());
        format!("Would render report version {}", next)
    }
}

/// Rebuilds the results archive from the report directory.
pub struct ArchiveStage;

#[async_trait]
impl Stage for ArchiveStage {
    fn id(&self) -> &str {
        "pipeline.archive"
    }

    fn name(&self) -> &str {
        "Results Archive"
    }

    fn description(&self) -> &str {
        "Packages the report directory into the results archive"
    }

    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError> {
        let paths = &context.run().paths;
        let artifact = archive::archive_dir(&paths.report_dir, &paths.archive)?;
        context.set_data(ARCHIVE_ARTIFACT_KEY, artifact);
        Ok(())
    }

    fn dry_run_description(&self, context: &StageContext) -> String {
        format!("Would archive report directory into {}", context.run().paths.archive.display())
    }
}

/// Engine-level cleanup: flush buffered log output before the process
/// reports its summary.
pub struct FlushLogsStage;

#[async_trait]
impl Stage for FlushLogsStage {
    fn id(&self) -> &str {
        "pipeline.flush_logs"
    }

    fn name(&self) -> &str {
        "Flush Logs"
    }

    fn description(&self) -> &str {
        "Flushes buffered log output"
    }

    async fn execute(&self, _context: &mut StageContext) -> Result<(), StageError> {
        log::logger().flush();
        Ok(())
    }
}

/// The external collaborators a pipeline run is wired with.
pub struct Collaborators {
    pub scm: Arc<dyn SourceControl>,
    pub env: Arc<dyn ToolEnvironment>,
    pub runner: Arc<dyn TestRunner>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub wiki: Arc<dyn Publisher>,
    pub tracker: Arc<dyn Publisher>,
    pub issues: Arc<dyn ExecutionTracker>,
    pub mailer: Arc<dyn Publisher>,
}

/// Assemble the full pipeline in its fixed order.
///
/// Preparation and artifact stages are fatal; publishing stages are
/// recoverable except downstream attachment, which must not silently lose
/// reports. The tracker upload is gated on a non-empty test-execution key.
pub fn build_pipeline(collaborators: Collaborators) -> Pipeline {
    PipelineBuilder::new(
        "Test Report Pipeline",
        "Builds, tests, reports and publishes a working copy",
    )
    .stage(Box::new(CheckoutStage::new(collaborators.scm)), FailurePolicy::Fatal)
    .stage(Box::new(EnvSetupStage::new(collaborators.env.clone())), FailurePolicy::Fatal)
    .stage(Box::new(DependencyInstallStage::new(collaborators.env)), FailurePolicy::Fatal)
    .stage(Box::new(TestRunStage::new(collaborators.runner)), FailurePolicy::Fatal)
    .stage(Box::new(ReportStage::new(collaborators.renderer)), FailurePolicy::Fatal)
    .stage(Box::new(WikiPublishStage::new(collaborators.wiki)), FailurePolicy::Recoverable)
    .stage(Box::new(ArchiveStage), FailurePolicy::Fatal)
    .entry(
        StageEntry::new(
            Box::new(TrackerUploadStage::new(collaborators.tracker)),
            FailurePolicy::Recoverable,
        )
        .with_gate(|ctx| {
            if ctx.run().params.test_execution_key.is_none() {
                Some("no test execution key supplied".to_string())
            } else {
                None
            }
        }),
    )
    .stage(
        Box::new(ExecutionCreateStage::new(collaborators.issues.clone())),
        FailurePolicy::Recoverable,
    )
    .stage(Box::new(AttachReportsStage::new(collaborators.issues)), FailurePolicy::Fatal)
    .stage(Box::new(EmailStage::new(collaborators.mailer)), FailurePolicy::Recoverable)
    .cleanup(Box::new(FlushLogsStage))
    .build()
}
