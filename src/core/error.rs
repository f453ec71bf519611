//! Definition errors

use crate::core::condition::ConditionParseError;
use thiserror::Error;

/// A pipeline definition that cannot be executed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("pipeline '{0}' has no steps")]
    Empty(String),

    #[error("step {step_index} references unknown agent '{agent_id}'")]
    UnknownAgent { step_index: usize, agent_id: String },

    #[error("step {step_index} retries from step {retry_from_step}, which is not an earlier step")]
    RetryOutOfRange {
        step_index: usize,
        retry_from_step: usize,
    },

    #[error("duplicate step order {0}")]
    DuplicateOrder(u32),

    #[error("step {step_index} sets '{field}' but is not a revision step")]
    RevisionFieldOnNonRevision {
        step_index: usize,
        field: &'static str,
    },

    #[error("step {step_index}: {source}")]
    InvalidCondition {
        step_index: usize,
        #[source]
        source: ConditionParseError,
    },
}
