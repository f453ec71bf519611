//! prose-pipeline - chain writing agents into pipelines with quality gates and revision loops

pub mod agent;
pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod presets;

// Re-export commonly used types
pub use agent::{AgentClientConfig, AgentError, AgentInvoker, AgentResponse, CommandInvoker};
pub use agent::{GenerationRequest, PromptResolver, RolePromptResolver, TokenSink};
pub use core::{
    AgentConfig, Condition, ConditionEvaluator, ExecutionStatus, PipelineConfig,
    PipelineDefinition, PipelineInput, PipelineRunOutcome, PipelineStep, StepResult,
};
pub use execution::{AbortHandle, NoopCallbacks, PipelineCallbacks, PipelineExecutor};
