#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::environment::{RunContext, RunParams};
use crate::pipeline::StageContext;
use crate::pipeline::tests::test_run_context;
use crate::publish::{Artifact, ExecutionTracker, PublishError, PublishOutcome, Publisher};
use crate::report::{REPORT_BASE_NAME, ReportArtifact};
use crate::runner::{
    ReportRenderer, RunnerError, SourceControl, TestRunner, TestSummary, ToolEnvironment,
};
use crate::stages::Collaborators;

// ===== STUB COLLABORATORS =====

pub struct StubScm {
    pub syncs: AtomicU32,
}

#[async_trait]
impl SourceControl for StubScm {
    async fn sync(&self) -> Result<(), RunnerError> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct RecordingEnv {
    pub installs: AtomicU32,
}

#[async_trait]
impl ToolEnvironment for RecordingEnv {
    async fn prepare(&self) -> Result<(), RunnerError> {
        Ok(())
    }

    async fn install(&self, _manifest: &Path) -> Result<(), RunnerError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FixedRunner {
    pub summary: TestSummary,
}

#[async_trait]
impl TestRunner for FixedRunner {
    async fn run(&self) -> Result<TestSummary, RunnerError> {
        Ok(self.summary)
    }
}

/// Renderer stub producing the version-stamped pair and `version.txt`,
/// exactly what the downstream stages validate.
pub struct PairRenderer {
    pub report_dir: PathBuf,
}

#[async_trait]
impl ReportRenderer for PairRenderer {
    async fn render(&self, version: u64) -> Result<(), RunnerError> {
        write_report_pair(&self.report_dir, version);
        fs::write(self.report_dir.join("version.txt"), version.to_string()).unwrap();
        Ok(())
    }
}

pub struct ScriptedPublisher {
    target: String,
    succeed: bool,
    detail: String,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedPublisher {
    pub fn ok(target: &str, detail: &str) -> Arc<Self> {
        Arc::new(Self {
            target: target.to_string(),
            succeed: true,
            detail: detail.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(target: &str, detail: &str) -> Arc<Self> {
        Arc::new(Self {
            target: target.to_string(),
            succeed: false,
            detail: detail.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    fn target(&self) -> &str {
        &self.target
    }

    async fn publish(&self, _run: &RunContext, artifact: &Artifact) -> PublishOutcome {
        self.calls.lock().await.push(artifact.kind().to_string());
        if self.succeed {
            PublishOutcome::succeeded(&self.target, self.detail.clone())
        } else {
            PublishOutcome::failed(&self.target, self.detail.clone())
        }
    }
}

pub struct ScriptedTracker {
    pub create_key: Option<String>,
    /// Recorded attach calls: (execution key, report version).
    pub attached: Mutex<Vec<(String, u64)>>,
}

impl ScriptedTracker {
    pub fn ok(key: &str) -> Arc<Self> {
        Arc::new(Self { create_key: Some(key.to_string()), attached: Mutex::new(Vec::new()) })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self { create_key: None, attached: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl ExecutionTracker for ScriptedTracker {
    async fn create_execution(&self, _run: &RunContext) -> Result<String, PublishError> {
        match &self.create_key {
            Some(key) => Ok(key.clone()),
            None => Err(PublishError::Rejected {
                target: "issue tracker".to_string(),
                status: 403,
                body: "forbidden".to_string(),
            }),
        }
    }

    async fn attach_reports(
        &self,
        _run: &RunContext,
        execution_key: &str,
        report: &ReportArtifact,
    ) -> PublishOutcome {
        self.attached.lock().await.push((execution_key.to_string(), report.version));
        PublishOutcome::succeeded("issue tracker", "2 attachments")
    }
}

// ===== HARNESS =====

/// A pipeline run fixture: a working directory with a dependency manifest
/// and report directory, stub collaborators and a live stage context.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub run: Arc<RunContext>,
    pub scm: Arc<StubScm>,
    pub env: Arc<RecordingEnv>,
    pub wiki: Arc<ScriptedPublisher>,
    pub tracker: Arc<ScriptedPublisher>,
    pub issues: Arc<ScriptedTracker>,
    pub mailer: Arc<ScriptedPublisher>,
}

impl Harness {
    pub fn new(params: RunParams) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let run = test_run_context(dir.path().to_path_buf(), params);
        fs::create_dir_all(&run.paths.report_dir).unwrap();
        fs::write(&run.paths.manifest, "requests==2.31.0\npytest==8.0.0\n").unwrap();

        Self {
            dir,
            run,
            scm: Arc::new(StubScm { syncs: AtomicU32::new(0) }),
            env: Arc::new(RecordingEnv { installs: AtomicU32::new(0) }),
            wiki: ScriptedPublisher::ok("wiki", "https://wiki.example.com/pages/1"),
            tracker: ScriptedPublisher::ok("test tracker", "import complete"),
            issues: ScriptedTracker::ok("RT-900"),
            mailer: ScriptedPublisher::ok("mail", "sent to 1 recipient"),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            scm: self.scm.clone(),
            env: self.env.clone(),
            runner: Arc::new(FixedRunner {
                summary: TestSummary { passed: 10, failed: 0, errors: 0, skipped: 1 },
            }),
            renderer: Arc::new(PairRenderer { report_dir: self.run.paths.report_dir.clone() }),
            wiki: self.wiki.clone(),
            tracker: self.tracker.clone(),
            issues: self.issues.clone(),
            mailer: self.mailer.clone(),
        }
    }

    pub fn live_context(&self) -> StageContext {
        StageContext::new_live(self.run.clone())
    }
}

/// Write the versioned HTML/PDF pair into `report_dir`.
pub fn write_report_pair(report_dir: &Path, version: u64) {
    fs::write(
        report_dir.join(format!("{}_v{}.html", REPORT_BASE_NAME, version)),
        "<html></html>",
    )
    .unwrap();
    fs::write(report_dir.join(format!("{}_v{}.pdf", REPORT_BASE_NAME, version)), "%PDF-1.4")
        .unwrap();
}
