//! Persistence layer for pipeline run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteHistoryStore;

pub use crate::core::ExecutionStatus;
use crate::core::PipelineRunOutcome;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Summary of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Final status
    pub status: ExecutionStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run ended
    pub completed_at: DateTime<Utc>,

    /// Results produced, revisions included
    pub steps_run: usize,

    /// Results that failed
    pub failed_steps: usize,

    /// Jump-backs taken across all revision steps
    pub revisions: u32,

    /// Words in the final prose
    pub prose_words: usize,

    /// Run-level error message
    pub error: Option<String>,
}

impl RunSummary {
    /// Summarize a finished run
    pub fn from_outcome(outcome: &PipelineRunOutcome) -> Self {
        Self {
            execution_id: outcome.execution_id,
            pipeline_name: outcome.pipeline_name.clone(),
            status: outcome.status,
            started_at: outcome.started_at,
            completed_at: outcome.completed_at,
            steps_run: outcome.results.len(),
            failed_steps: outcome.failed_steps(),
            revisions: outcome.iterations.values().sum(),
            prose_words: outcome.prose_text.split_whitespace().count(),
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Trait for history backends
#[async_trait::async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Save a run
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, execution_id: Uuid) -> Result<Option<RunSummary>>;

    /// Most recent runs first, across all pipelines
    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>>;

    /// All runs for a pipeline, most recent first
    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>>;

    /// Names of pipelines with recorded runs
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory history (for testing or ephemeral use)
#[derive(Default)]
pub struct InMemoryHistory {
    runs: RwLock<HashMap<Uuid, RunSummary>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(runs: &mut [RunSummary]) {
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
}

#[async_trait::async_trait]
impl HistoryBackend for InMemoryHistory {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        self.runs.write().await.insert(run.execution_id, run.clone());
        Ok(())
    }

    async fn load_run(&self, execution_id: Uuid) -> Result<Option<RunSummary>> {
        Ok(self.runs.read().await.get(&execution_id).cloned())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let mut runs: Vec<_> = self.runs.read().await.values().cloned().collect();
        newest_first(&mut runs);
        runs.truncate(limit);
        Ok(runs)
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>> {
        let mut runs: Vec<_> = self
            .runs
            .read()
            .await
            .values()
            .filter(|r| r.pipeline_name == pipeline_name)
            .cloned()
            .collect();
        newest_first(&mut runs);
        Ok(runs)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let mut names: Vec<_> = self
            .runs
            .read()
            .await
            .values()
            .map(|r| r.pipeline_name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
