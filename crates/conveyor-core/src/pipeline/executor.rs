//! The stage graph and its sequential executor.
//!
//! The graph is an explicit, inspectable ordered list of [`StageEntry`]
//! records; ordering is fixed and total, no two stages run concurrently,
//! and skipping is always the explicit result of a gate evaluating false.
use std::fmt;

use crate::pipeline::context::StageContext;
use crate::pipeline::{FailurePolicy, Stage, StageState};

/// Gating predicate: `Some(reason)` transitions the stage to `Skipped`
/// without running its body or post-actions.
pub type GateFn = Box<dyn Fn(&StageContext) -> Option<String> + Send + Sync>;

/// One stage of the graph: the body, its failure classification, an
/// optional gate and the ordered post-actions that run regardless of a
/// recoverable body failure.
pub struct StageEntry {
    stage: Box<dyn Stage>,
    policy: FailurePolicy,
    gate: Option<GateFn>,
    post_actions: Vec<Box<dyn Stage>>,
}

impl StageEntry {
    pub fn new(stage: Box<dyn Stage>, policy: FailurePolicy) -> Self {
        Self { stage, policy, gate: None, post_actions: Vec::new() }
    }

    /// Attach a gating predicate evaluated against the context.
    pub fn with_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&StageContext) -> Option<String> + Send + Sync + 'static,
    {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Append a post-action ("always" semantics for recoverable outcomes).
    pub fn with_post_action(mut self, action: Box<dyn Stage>) -> Self {
        self.post_actions.push(action);
        self
    }

    pub fn id(&self) -> &str {
        self.stage.id()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }
}

/// Stage execution pipeline
pub struct Pipeline {
    /// Name of the pipeline
    name: String,
    /// Description of what this pipeline does
    description: String,
    /// Ordered list of stage entries to execute
    entries: Vec<StageEntry>,
    /// Engine-level cleanup hook; always runs, even after a fatal failure.
    cleanup: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Get the name of the pipeline
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description of the pipeline
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the ordered stage entries
    pub fn entries(&self) -> &[StageEntry] {
        &self.entries
    }

    /// Execute the pipeline sequentially against the given context.
    ///
    /// Never returns an error: every outcome, including a fatal abort, is
    /// recorded in the [`RunSummary`] so the caller can render it and map
    /// it to an exit code.
    pub async fn execute(&self, context: &mut StageContext) -> RunSummary {
        log::info!("Executing pipeline: {} - {}", self.name, self.description);
        if context.is_dry_run() {
            log::info!("MODE: DRY RUN");
        }

        let mut summary = RunSummary::default();
        let mut aborted = false;

        for entry in &self.entries {
            let stage_id = entry.id().to_string();

            if aborted {
                // No further pending stages are evaluated after a fatal
                // failure; they stay Pending in the summary.
                summary.reports.push(StageReport {
                    stage_id,
                    state: StageState::Pending,
                    policy: entry.policy,
                    detail: None,
                });
                continue;
            }

            if let Some(gate) = &entry.gate {
                if let Some(reason) = gate(context) {
                    log::info!("Skipping stage '{}': {}", stage_id, reason);
                    summary.reports.push(StageReport {
                        stage_id,
                        state: StageState::Skipped,
                        policy: entry.policy,
                        detail: Some(reason),
                    });
                    continue;
                }
            }

            if context.is_dry_run() {
                let description = entry.stage.dry_run_description(context);
                log::info!("DRY RUN: {}", description);
                summary.reports.push(StageReport {
                    stage_id,
                    state: StageState::Succeeded,
                    policy: entry.policy,
                    detail: Some(description),
                });
                continue;
            }

            log::info!("Running stage: {} ({})", entry.stage.name(), stage_id);
            match entry.stage.execute(context).await {
                Ok(()) => {
                    log::info!("Stage completed successfully: {}", stage_id);
                    summary.reports.push(StageReport {
                        stage_id,
                        state: StageState::Succeeded,
                        policy: entry.policy,
                        detail: None,
                    });
                    self.run_post_actions(entry, context).await;
                }
                Err(e) => {
                    log::error!("Stage failed: {} - {}", stage_id, e);
                    summary.reports.push(StageReport {
                        stage_id: stage_id.clone(),
                        state: StageState::Failed,
                        policy: entry.policy,
                        detail: Some(e.to_string()),
                    });
                    match entry.policy {
                        FailurePolicy::Fatal => {
                            summary.aborted_by = Some(stage_id);
                            aborted = true;
                        }
                        FailurePolicy::Recoverable => {
                            self.run_post_actions(entry, context).await;
                        }
                    }
                }
            }
        }

        self.run_cleanup(context, &mut summary).await;
        summary
    }

    /// Post-actions run after a succeeded body and after a recoverable
    /// failure; their own failures are recorded but never abort the run.
    async fn run_post_actions(&self, entry: &StageEntry, context: &mut StageContext) {
        for action in &entry.post_actions {
            if let Err(e) = action.execute(context).await {
                log::warn!("Post-action '{}' of stage '{}' failed: {}", action.id(), entry.id(), e);
            }
        }
    }

    async fn run_cleanup(&self, context: &mut StageContext, summary: &mut RunSummary) {
        for stage in &self.cleanup {
            let stage_id = stage.id().to_string();
            if context.is_dry_run() {
                summary.cleanup.push(StageReport {
                    stage_id,
                    state: StageState::Succeeded,
                    policy: FailurePolicy::Recoverable,
                    detail: Some(stage.dry_run_description(context)),
                });
                continue;
            }
            let report = match stage.execute(context).await {
                Ok(()) => StageReport {
                    stage_id,
                    state: StageState::Succeeded,
                    policy: FailurePolicy::Recoverable,
                    detail: None,
                },
                Err(e) => {
                    log::warn!("Cleanup stage '{}' failed: {}", stage.id(), e);
                    StageReport {
                        stage_id,
                        state: StageState::Failed,
                        policy: FailurePolicy::Recoverable,
                        detail: Some(e.to_string()),
                    }
                }
            };
            summary.cleanup.push(report);
        }
    }
}

/// Pipeline builder for simplified pipeline creation
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    /// Start building a new pipeline
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            pipeline: Pipeline {
                name: name.to_string(),
                description: description.to_string(),
                entries: Vec::new(),
                cleanup: Vec::new(),
            },
        }
    }

    /// Append a stage entry; order of insertion is execution order.
    pub fn entry(mut self, entry: StageEntry) -> Self {
        self.pipeline.entries.push(entry);
        self
    }

    /// Append an ungated stage with the given failure policy.
    pub fn stage(self, stage: Box<dyn Stage>, policy: FailurePolicy) -> Self {
        self.entry(StageEntry::new(stage, policy))
    }

    /// Append an engine-level cleanup stage.
    pub fn cleanup(mut self, stage: Box<dyn Stage>) -> Self {
        self.pipeline.cleanup.push(stage);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Pipeline {
        self.pipeline
    }
}

/// Terminal record of one stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage_id: String,
    pub state: StageState,
    pub policy: FailurePolicy,
    pub detail: Option<String>,
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per stage entry, in execution order.
    pub reports: Vec<StageReport>,
    /// Reports of the engine-level cleanup stages.
    pub cleanup: Vec<StageReport>,
    /// Id of the fatal stage that aborted the run, if any.
    pub aborted_by: Option<String>,
}

impl RunSummary {
    /// True iff no fatal-classified stage reached `Failed`.
    pub fn success(&self) -> bool {
        self.aborted_by.is_none()
    }

    /// Exit code for the overall run.
    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    /// Terminal state of a stage by id.
    pub fn state_of(&self, stage_id: &str) -> Option<StageState> {
        self.reports
            .iter()
            .find(|r| r.stage_id == stage_id)
            .map(|r| r.state)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.aborted_by {
            None => writeln!(f, "== Pipeline succeeded ==")?,
            Some(stage) => writeln!(f, "== Pipeline failed (aborted by '{}') ==", stage)?,
        }
        for report in &self.reports {
            match &report.detail {
                Some(detail) => writeln!(f, "  - {}: {} ({})", report.stage_id, report.state, detail)?,
                None => writeln!(f, "  - {}: {}", report.stage_id, report.state)?,
            }
        }
        writeln!(f, "== Cleanup complete ==")?;
        for report in &self.cleanup {
            writeln!(f, "  - {}: {}", report.stage_id, report.state)?;
        }
        Ok(())
    }
}
