use std::collections::HashMap;
use std::sync::Arc;

use crate::environment::RunContext;

/// Execution mode for stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Live mode - actually execute operations
    Live,
    /// Dry run mode - simulate operations without executing them
    DryRun,
}

impl ExecutionMode {
    /// Check if this is dry run mode
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ExecutionMode::DryRun)
    }

    /// Check if this is live mode
    pub fn is_live(&self) -> bool {
        matches!(self, ExecutionMode::Live)
    }
}

/// Context provided to stages during execution.
///
/// The immutable [`RunContext`] is shared read-only with every stage; the
/// shared-data map carries values produced by earlier stages for later
/// ones (the report artifact, the execution identifier, collected links).
pub struct StageContext {
    /// The execution mode
    pub mode: ExecutionMode,

    /// Immutable run-scoped configuration
    run: Arc<RunContext>,

    /// Shared data between stages
    shared_data: HashMap<String, Box<dyn std::any::Any + Send + Sync>>,
}

impl StageContext {
    /// Create a new context in live mode
    pub fn new_live(run: Arc<RunContext>) -> Self {
        Self {
            mode: ExecutionMode::Live,
            run,
            shared_data: HashMap::new(),
        }
    }

    /// Create a new context in dry run mode
    pub fn new_dry_run(run: Arc<RunContext>) -> Self {
        Self {
            mode: ExecutionMode::DryRun,
            run,
            shared_data: HashMap::new(),
        }
    }

    /// Get the immutable run context
    pub fn run(&self) -> &RunContext {
        &self.run
    }

    /// Get a cloned handle to the run context
    pub fn run_arc(&self) -> Arc<RunContext> {
        Arc::clone(&self.run)
    }

    /// Set a shared data value
    pub fn set_data<T: 'static + Send + Sync>(&mut self, key: &str, value: T) {
        self.shared_data.insert(key.to_string(), Box::new(value));
    }

    /// Get a shared data value
    pub fn get_data<T: 'static + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.shared_data.get(key).and_then(|data| data.downcast_ref::<T>())
    }

    /// Get a mutable reference to a shared data value
    pub fn get_data_mut<T: 'static + Send + Sync>(&mut self, key: &str) -> Option<&mut T> {
        self.shared_data.get_mut(key).and_then(|data| data.downcast_mut::<T>())
    }

    /// Check if dry run mode is active
    pub fn is_dry_run(&self) -> bool {
        self.mode.is_dry_run()
    }
}
