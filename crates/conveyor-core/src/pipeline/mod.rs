//! # Conveyor Stage Graph & Executor
//!
//! The ordered execution of named stages with conditional gating and
//! differentiated failure propagation. Each stage moves through
//! `Pending -> (Skipped | Running -> (Succeeded | Failed))`; a failed
//! stage marked [`FailurePolicy::Fatal`] aborts the remainder of the run
//! (the engine-level cleanup hook still runs), while a recoverable failure
//! is recorded and execution proceeds.
pub mod context;
pub mod error;
pub mod executor;
pub mod lock;

use std::fmt;

use async_trait::async_trait;

/// Boxed error type stage bodies return.
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core trait that all stages must implement
#[async_trait]
pub trait Stage: Send + Sync {
    /// The unique identifier of the stage
    fn id(&self) -> &str;

    /// The human-readable name of the stage
    fn name(&self) -> &str;

    /// The description of what this stage does
    fn description(&self) -> &str;

    /// Execute the stage with the given context
    async fn execute(&self, context: &mut StageContext) -> Result<(), StageError>;

    /// Generate a description of what this stage would do in dry run mode
    fn dry_run_description(&self, _context: &StageContext) -> String {
        format!("Would execute stage: {}", self.name())
    }
}

/// How a stage failure affects the remainder of the run. A static property
/// of each stage definition, not something the body decides at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Failure aborts all remaining pending stages.
    Fatal,
    /// Failure is recorded and the executor proceeds.
    Recoverable,
}

/// Lifecycle state of a stage within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Skipped,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageState::Pending => "Pending",
            StageState::Skipped => "Skipped",
            StageState::Running => "Running",
            StageState::Succeeded => "Succeeded",
            StageState::Failed => "Failed",
        };
        f.write_str(label)
    }
}

// Re-export important types
pub use context::{ExecutionMode, StageContext};
pub use error::PipelineError;
pub use executor::{Pipeline, PipelineBuilder, RunSummary, StageEntry, StageReport};
pub use lock::RunLock;

// Test module declaration; shared helpers are used by stage tests too
#[cfg(test)]
pub(crate) mod tests;
