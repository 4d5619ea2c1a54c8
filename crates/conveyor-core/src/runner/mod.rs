//! # Conveyor External Collaborators
//!
//! Typed contracts for the heavy work the orchestration core delegates:
//! syncing the working copy, maintaining the persistent installation
//! environment, running the test suite and rendering the versioned report
//! pair. The core never constructs shell command strings; process-based
//! implementations live in [`process`] and pass typed argument lists.
pub mod error;
pub mod process;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

pub use error::RunnerError;

/// Brings the working copy up to date before the pipeline operates on it.
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn sync(&self) -> Result<(), RunnerError>;
}

/// The persistent installation environment shared across runs.
#[async_trait]
pub trait ToolEnvironment: Send + Sync {
    /// Create the environment if it does not exist yet.
    async fn prepare(&self) -> Result<(), RunnerError>;

    /// Install the packages listed in `manifest` into the environment.
    async fn install(&self, manifest: &Path) -> Result<(), RunnerError>;
}

/// Executes the test suite, producing a JUnit-style XML results file and a
/// self-contained HTML results page in the report directory.
///
/// `Ok(summary)` means the runner completed, whether or not tests passed;
/// an `Err` means the runner environment itself is broken.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self) -> Result<TestSummary, RunnerError>;
}

/// Renders the version-stamped HTML/PDF report pair and `version.txt` from
/// the test results already present in the report directory.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, version: u64) -> Result<(), RunnerError>;
}

/// Counts extracted from a completed test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
    pub skipped: u32,
}

impl TestSummary {
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.errors + self.skipped
    }

    pub fn pass_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.passed) / f64::from(total) * 100.0
    }

    /// True when no test failed or errored.
    pub fn is_green(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    pub fn status(&self) -> &'static str {
        if self.is_green() { "PASS" } else { "FAIL" }
    }

    /// Extract counts from runner output containing phrases like
    /// `3 passed`, `1 failed`, `2 errors`, `4 skipped`. The last
    /// occurrence of each phrase wins, matching the runner's final
    /// summary line.
    pub fn parse(output: &str) -> Self {
        let mut summary = Self::default();
        let words: Vec<&str> = output.split_whitespace().collect();
        for pair in words.windows(2) {
            let Ok(count) = pair[0].parse::<u32>() else { continue };
            let label = pair[1].trim_matches(|c: char| !c.is_ascii_alphabetic());
            match label.to_ascii_lowercase().as_str() {
                "passed" => summary.passed = count,
                "failed" => summary.failed = count,
                "error" | "errors" => summary.errors = count,
                "skipped" => summary.skipped = count,
                _ => {}
            }
        }
        summary
    }
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errors, {} skipped (pass rate {:.1}%)",
            self.passed,
            self.failed,
            self.errors,
            self.skipped,
            self.pass_rate()
        )
    }
}
