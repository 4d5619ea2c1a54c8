//! Process-based collaborator implementations.
//!
//! Every command is built with `tokio::process::Command` and a typed
//! argument list; nothing here goes through a shell.
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;

use crate::runner::{RunnerError, SourceControl, TestRunner, TestSummary, ToolEnvironment, ReportRenderer};

/// Captured runner output, written next to the test results.
pub const RUNNER_LOG: &str = "pytest_output.txt";

async fn run_command(mut command: Command, program: &str) -> Result<Output, RunnerError> {
    let output = command.output().await.map_err(|source| RunnerError::Spawn {
        program: program.to_string(),
        source,
    })?;
    Ok(output)
}

fn tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    // Last few lines are enough to reconstruct the failure point.
    let lines: Vec<&str> = text.lines().rev().take(5).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join("\n")
}

fn expect_success(output: Output, program: &str) -> Result<Output, RunnerError> {
    if !output.status.success() {
        return Err(RunnerError::CommandFailed {
            program: program.to_string(),
            code: output.status.code(),
            detail: tail(&output),
        });
    }
    Ok(output)
}

/// Git-backed working copy sync.
pub struct GitCheckout {
    pub workdir: PathBuf,
    pub remote: Option<String>,
    pub branch: Option<String>,
}

#[async_trait]
impl SourceControl for GitCheckout {
    async fn sync(&self) -> Result<(), RunnerError> {
        if self.workdir.join(".git").is_dir() {
            let mut command = Command::new("git");
            command.arg("-C").arg(&self.workdir).args(["pull", "--ff-only"]);
            if let Some(branch) = &self.branch {
                command.args(["origin", branch]);
            }
            expect_success(run_command(command, "git").await?, "git")?;
            log::info!("Working copy synced: {}", self.workdir.display());
            return Ok(());
        }

        match &self.remote {
            Some(remote) => {
                let mut command = Command::new("git");
                command.arg("clone").arg(remote).arg(&self.workdir);
                if let Some(branch) = &self.branch {
                    command.args(["--branch", branch]);
                }
                expect_success(run_command(command, "git").await?, "git")?;
                log::info!("Cloned {} into {}", remote, self.workdir.display());
                Ok(())
            }
            None => {
                // CI-provided working copy, nothing to sync.
                log::info!("No .git and no remote configured; using working copy as-is");
                Ok(())
            }
        }
    }
}

/// Virtualenv-style persistent installation environment.
pub struct Virtualenv {
    /// Base interpreter used to create the environment.
    pub base_python: PathBuf,
    /// Root directory of the environment.
    pub root: PathBuf,
}

impl Virtualenv {
    /// Interpreter inside the environment.
    pub fn interpreter(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("Scripts").join("python.exe")
        } else {
            self.root.join("bin").join("python")
        }
    }
}

#[async_trait]
impl ToolEnvironment for Virtualenv {
    async fn prepare(&self) -> Result<(), RunnerError> {
        if self.interpreter().is_file() {
            log::debug!("Tool environment already present: {}", self.root.display());
            return Ok(());
        }
        let mut command = Command::new(&self.base_python);
        command.args(["-m", "venv"]).arg(&self.root);
        expect_success(run_command(command, "python -m venv").await?, "python -m venv")?;
        log::info!("Tool environment created: {}", self.root.display());
        Ok(())
    }

    async fn install(&self, manifest: &Path) -> Result<(), RunnerError> {
        let mut command = Command::new(self.interpreter());
        command.args(["-m", "pip", "install", "-r"]).arg(manifest);
        expect_success(run_command(command, "pip install").await?, "pip install")?;
        Ok(())
    }
}

/// Pytest invocation producing JUnit XML, a self-contained HTML page and
/// the captured runner log in the report directory.
pub struct PytestRunner {
    pub python: PathBuf,
    pub workdir: PathBuf,
    pub report_dir: PathBuf,
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run(&self) -> Result<TestSummary, RunnerError> {
        let results_xml = self.report_dir.join("results.xml");
        let html_page = self.report_dir.join("report.html");

        let mut command = Command::new(&self.python);
        command
            .current_dir(&self.workdir)
            .args(["-m", "pytest"])
            .arg(format!("--junitxml={}", results_xml.display()))
            .arg(format!("--html={}", html_page.display()))
            .arg("--self-contained-html");

        let output = run_command(command, "pytest").await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        let log_path = self.report_dir.join(RUNNER_LOG);
        tokio::fs::write(&log_path, &stdout).await.map_err(|source| RunnerError::Io {
            operation: "write_runner_log".to_string(),
            path: log_path,
            source,
        })?;

        // Exit 0 = all passed, 1 = tests ran but some failed. Anything
        // else (usage error, internal error, interrupted) means the runner
        // itself is broken and the pipeline must stop.
        match output.status.code() {
            Some(0) | Some(1) => Ok(TestSummary::parse(&stdout)),
            code => Err(RunnerError::RunnerBroken { code, detail: tail(&output) }),
        }
    }
}

/// External report renderer invocation.
pub struct ProcessRenderer {
    pub program: PathBuf,
    pub report_dir: PathBuf,
}

#[async_trait]
impl ReportRenderer for ProcessRenderer {
    async fn render(&self, version: u64) -> Result<(), RunnerError> {
        let program = self.program.display().to_string();
        let mut command = Command::new(&self.program);
        command
            .arg("--report-dir")
            .arg(&self.report_dir)
            .arg("--version")
            .arg(version.to_string());
        expect_success(run_command(command, &program).await?, &program)?;
        Ok(())
    }
}
