// Core library of the Conveyor pipeline orchestrator
pub mod archive;
pub mod cache;
pub mod environment;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod runner;
pub mod stages;

// Re-export key public types/traits for easier use by the binary
pub use environment::{ConfigError, EnvSecretProvider, RunContext, RunParams, SecretProvider};
pub use pipeline::{
    ExecutionMode, FailurePolicy, Pipeline, PipelineError, RunLock, RunSummary, Stage,
    StageContext,
};
pub use publish::{ExecutionTracker, Publisher};
pub use runner::{ReportRenderer, SourceControl, TestRunner, TestSummary, ToolEnvironment};
pub use stages::{Collaborators, build_pipeline};

// Cross-module integration tests
#[cfg(test)]
mod tests;
