//! Step runner - runs one step with the invoker

use crate::{
    agent::{AgentError, AgentInvoker, GenerationRequest, PromptResolver, TokenSink},
    core::{ErrorKind, ExecutableStep, PipelineInput, RunContext, StepResult},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Result of running one step once
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Generation succeeded
    Completed(StepResult),
    /// Generation failed or timed out; `result` carries `success = false`
    Failed { result: StepResult, error: ErrorKind },
    /// The run was aborted while the step was in flight; nothing is recorded
    Cancelled,
}

/// Executes a single step
pub struct StepRunner<A> {
    invoker: A,
    resolver: Arc<dyn PromptResolver>,
    default_timeout: Duration,
}

impl<A: AgentInvoker> StepRunner<A> {
    pub fn new(invoker: A, resolver: Arc<dyn PromptResolver>, default_timeout: Duration) -> Self {
        Self {
            invoker,
            resolver,
            default_timeout,
        }
    }

    pub fn set_resolver(&mut self, resolver: Arc<dyn PromptResolver>) {
        self.resolver = resolver;
    }

    pub fn set_default_timeout(&mut self, default_timeout: Duration) {
        self.default_timeout = default_timeout;
    }

    /// Timeout applied to a step
    pub fn timeout_for(&self, step: &ExecutableStep) -> Duration {
        step.step
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }

    /// Run a step and build its result
    ///
    /// Tokens go to `sink` only when the step streams its output. They are
    /// all delivered before this returns.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        step: &ExecutableStep,
        ctx: &RunContext,
        input: &PipelineInput,
        instruction: Option<&str>,
        iteration: u32,
        sink: &dyn TokenSink,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let agent = &step.agent;
        info!("Running step {} ({}, role {})", step.index, agent.name, agent.role);

        let prompt = self.resolver.resolve(agent, ctx, input, instruction);
        debug!("Prompt for step {}: {:?}", step.index, prompt);
        let request = GenerationRequest::for_agent(agent, prompt);

        let sink = step.step.stream_output.then_some(sink);
        let limit = self.timeout_for(step);
        let started_at = Utc::now();

        let generation = timeout(limit, self.invoker.generate(&request, sink, cancel));
        let outcome = tokio::select! {
            result = generation => result,
            _ = cancel.cancelled() => {
                info!("Step {} cancelled in flight", step.index);
                return StepOutcome::Cancelled;
            }
        };

        let build = |output: String, error: Option<String>| StepResult {
            step_index: step.index,
            agent_name: agent.name.clone(),
            role: agent.role.clone(),
            success: error.is_none(),
            output,
            error,
            is_revision: step.step.is_revision,
            iteration,
            prompt_sent: Some(request.prompt.clone()),
            started_at,
            completed_at: Utc::now(),
        };

        match outcome {
            Ok(Ok(response)) => {
                match response.usage {
                    Some(usage) => debug!(
                        "Step {} produced {} bytes ({} tokens)",
                        step.index,
                        response.content.len(),
                        usage.total_tokens
                    ),
                    None => debug!("Step {} produced {} bytes", step.index, response.content.len()),
                }
                StepOutcome::Completed(build(response.content, None))
            }
            Ok(Err(AgentError::Cancelled)) => StepOutcome::Cancelled,
            Ok(Err(AgentError::Timeout(secs))) => {
                error!("Invoker timed out for step {} after {}s", step.index, secs);
                StepOutcome::Failed {
                    result: build(String::new(), Some(AgentError::Timeout(secs).to_string())),
                    error: ErrorKind::Timeout {
                        step_index: step.index,
                        secs,
                    },
                }
            }
            Ok(Err(e)) => {
                error!("Agent error for step {}: {}", step.index, e);
                let message = e.to_string();
                StepOutcome::Failed {
                    result: build(String::new(), Some(message.clone())),
                    error: ErrorKind::Generation {
                        step_index: step.index,
                        message,
                    },
                }
            }
            Err(_) => {
                let secs = limit.as_secs();
                error!("Timeout for step {} after {}s", step.index, secs);
                StepOutcome::Failed {
                    result: build(String::new(), Some(format!("Timeout after {} seconds", secs))),
                    error: ErrorKind::Timeout {
                        step_index: step.index,
                        secs,
                    },
                }
            }
        }
    }
}
