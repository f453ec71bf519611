//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::agent::ResolvedPrompt;
use crate::core::agent::roles;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Ready,
    /// Run is walking its steps
    Running,
    /// Cursor passed the last step
    Completed,
    /// Abort was requested
    Aborted,
    /// The last step failed
    Failed,
}

impl ExecutionStatus {
    /// Check if the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Aborted | ExecutionStatus::Failed
        )
    }
}

/// Result of running one step once
///
/// Results are append-only: a revision re-run produces a new result and
/// never edits an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Index of the step in the definition
    pub step_index: usize,

    /// Name of the agent that produced the output
    pub agent_name: String,

    /// Role of the agent that produced the output
    pub role: String,

    /// Generated text (empty on failure)
    pub output: String,

    /// Whether generation succeeded
    pub success: bool,

    /// Error message when generation failed
    pub error: Option<String>,

    /// Whether the step ran with a revision instruction
    pub is_revision: bool,

    /// How many jump-backs this step had triggered before this attempt
    pub iteration: u32,

    /// Exact messages sent to the model for this attempt
    #[serde(default)]
    pub prompt_sent: Option<ResolvedPrompt>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl StepResult {
    /// Wall-clock duration of the step
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Run-level error recorded on the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// The invoker failed for a step
    Generation { step_index: usize, message: String },
    /// The invoker did not finish in time
    Timeout { step_index: usize, secs: u64 },
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Generation { step_index, message } => {
                write!(f, "step {} failed: {}", step_index, message)
            }
            ErrorKind::Timeout { step_index, secs } => {
                write!(f, "step {} timed out after {}s", step_index, secs)
            }
        }
    }
}

/// Terminal value of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunOutcome {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Name of the pipeline that ran
    pub pipeline_name: String,

    /// Final status
    pub status: ExecutionStatus,

    /// Output of the most recent successful step
    pub final_text: String,

    /// Output of the most recent successful prose-producing step
    pub prose_text: String,

    /// Every result in production order
    pub results: Vec<StepResult>,

    /// Jump-backs taken per revision step
    pub iterations: BTreeMap<usize, u32>,

    /// Whether the run stopped on abort
    pub aborted: bool,

    /// Run-level error, if the run failed
    pub error: Option<ErrorKind>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl PipelineRunOutcome {
    /// Number of results that failed
    pub fn failed_steps(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    /// How many times a given step index produced a result
    pub fn visits(&self, step_index: usize) -> usize {
        self.results.iter().filter(|r| r.step_index == step_index).count()
    }

    /// Step indices in the order they produced results
    pub fn trace(&self) -> Vec<usize> {
        self.results.iter().map(|r| r.step_index).collect()
    }
}

/// Output of the most recent successful result
pub fn last_successful_output(results: &[StepResult]) -> String {
    results
        .iter()
        .rev()
        .find(|r| r.success)
        .map(|r| r.output.clone())
        .unwrap_or_default()
}

/// Output of the most recent successful prose-producing result
pub fn last_prose_output(results: &[StepResult]) -> String {
    results
        .iter()
        .rev()
        .find(|r| r.success && roles::is_prose_role(&r.role))
        .map(|r| r.output.clone())
        .unwrap_or_default()
}
