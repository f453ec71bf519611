//! Main execution engine - orchestrates a pipeline run

use crate::{
    agent::{AgentInvoker, PromptResolver, RolePromptResolver, TokenSink},
    core::{
        last_prose_output, last_successful_output, ConditionEvaluator, EngineSettings, ErrorKind,
        ExecutionStatus, PipelineDefinition, PipelineInput, PipelineRunOutcome, RunContext,
        StepResult,
    },
    execution::{RevisionController, RevisionDecision, StepCursor, StepOutcome, StepRunner},
};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle notifications for one run
///
/// All methods default to no-ops. They are called synchronously from the run,
/// in order.
pub trait PipelineCallbacks: Send + Sync {
    /// A step is about to run
    fn on_step_start(&self, _index: usize, _agent_name: &str) {}

    /// A result was appended (failed results included)
    fn on_step_complete(&self, _result: &StepResult, _index: usize) {}

    /// A streamed token from the running step
    fn on_token(&self, _token: &str) {}

    /// A step's condition did not hold
    fn on_step_skipped(&self, _index: usize, _reason: &str) {}

    /// A step failed; the run continues unless it was the last step
    fn on_step_failed(&self, _index: usize, _error: &ErrorKind) {}

    /// A revision step moved the cursor back
    fn on_revision(&self, _from: usize, _to: usize, _iteration: u32) {}
}

/// Callbacks that ignore every notification
#[derive(Debug, Clone, Default)]
pub struct NoopCallbacks;

impl PipelineCallbacks for NoopCallbacks {}

/// Routes invoker tokens to the run's callbacks
struct CallbackSink<'a>(&'a dyn PipelineCallbacks);

impl TokenSink for CallbackSink<'_> {
    fn on_token(&self, token: &str) {
        self.0.on_token(token);
    }
}

/// Cloneable handle that aborts the runs of one executor
#[derive(Debug, Clone)]
pub struct AbortHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl AbortHandle {
    /// Abort every run in progress; runs started afterwards are unaffected
    pub fn abort(&self) {
        let mut token = self.token.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }

    fn current(&self) -> CancellationToken {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Runs pipeline definitions against an invoker
pub struct PipelineExecutor<A> {
    runner: StepRunner<A>,
    evaluator: ConditionEvaluator,
    abort: AbortHandle,
}

impl<A: AgentInvoker> PipelineExecutor<A> {
    /// Executor with the role prompt resolver and default engine settings
    pub fn new(invoker: A) -> Self {
        let settings = EngineSettings::default();
        Self {
            runner: StepRunner::new(invoker, Arc::new(RolePromptResolver), settings.step_timeout()),
            evaluator: settings.evaluator(),
            abort: AbortHandle {
                token: Arc::new(Mutex::new(CancellationToken::new())),
            },
        }
    }

    /// Apply judge roles, issue markers and the step timeout
    pub fn with_settings(mut self, settings: &EngineSettings) -> Self {
        self.evaluator = settings.evaluator();
        self.runner.set_default_timeout(settings.step_timeout());
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PromptResolver>) -> Self {
        self.runner.set_resolver(resolver);
        self
    }

    pub fn with_evaluator(mut self, evaluator: ConditionEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.runner.set_default_timeout(timeout);
        self
    }

    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    /// Abort every run in progress on this executor
    pub fn abort(&self) {
        info!("Abort requested");
        self.abort.abort();
    }

    /// Handle that can abort runs from another task
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Execute a pipeline to completion, abort or terminal failure
    pub async fn execute(
        &self,
        definition: &PipelineDefinition,
        input: &PipelineInput,
        callbacks: &dyn PipelineCallbacks,
    ) -> PipelineRunOutcome {
        let cancel = self.abort.current();
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Starting pipeline execution: {} ({}, {} steps)",
            definition.name,
            execution_id,
            definition.len()
        );

        let mut ctx = RunContext::new(input);
        let mut cursor = StepCursor::new(definition.len());
        let revision = RevisionController::new(&self.evaluator);
        let sink = CallbackSink(callbacks);
        let mut status = ExecutionStatus::Running;
        let mut error = None;

        while let Some(index) = cursor.current() {
            if cancel.is_cancelled() {
                info!("Pipeline {} aborted before step {}", definition.name, index);
                status = ExecutionStatus::Aborted;
                break;
            }

            let Some(step) = definition.step(index) else {
                break;
            };

            if !self
                .evaluator
                .evaluate(&step.condition, &step.step.validation_keywords, &ctx)
            {
                let reason = format!("condition '{}' not met", step.condition);
                debug!("Skipping step {}: {}", index, reason);
                callbacks.on_step_skipped(index, &reason);
                cursor.advance();
                continue;
            }

            let instruction = if step.step.is_revision {
                debug!(
                    "Revision step {} state: {:?}",
                    index,
                    revision.state(step, &ctx)
                );
                Some(revision.instruction(step, &ctx, input))
            } else {
                None
            };

            callbacks.on_step_start(index, &step.agent.name);
            let outcome = self
                .runner
                .run(
                    step,
                    &ctx,
                    input,
                    instruction.as_deref(),
                    ctx.iterations(index),
                    &sink,
                    &cancel,
                )
                .await;

            match outcome {
                StepOutcome::Cancelled => {
                    info!("Pipeline {} aborted during step {}", definition.name, index);
                    status = ExecutionStatus::Aborted;
                    break;
                }
                StepOutcome::Completed(result) => {
                    ctx.push_result(result.clone());
                    callbacks.on_step_complete(&result, index);
                }
                StepOutcome::Failed { result, error: kind } => {
                    ctx.push_result(result.clone());
                    callbacks.on_step_failed(index, &kind);
                    callbacks.on_step_complete(&result, index);
                    if cursor.is_last() {
                        warn!("Final step {} failed: {}", index, kind);
                        status = ExecutionStatus::Failed;
                        error = Some(kind);
                        break;
                    }
                    warn!("Step {} failed, continuing: {}", index, kind);
                }
            }

            if step.step.is_revision {
                if let RevisionDecision::JumpBack { to, iteration } =
                    revision.after_attempt(step, &mut ctx)
                {
                    callbacks.on_revision(index, to, iteration);
                    cursor.jump_to(to);
                    continue;
                }
            }

            cursor.advance();
        }

        if status == ExecutionStatus::Running {
            status = ExecutionStatus::Completed;
        }

        let (results, iterations) = ctx.into_parts();
        let outcome = PipelineRunOutcome {
            execution_id,
            pipeline_name: definition.name.clone(),
            status,
            final_text: last_successful_output(&results),
            prose_text: last_prose_output(&results),
            aborted: status == ExecutionStatus::Aborted,
            results,
            iterations,
            error,
            started_at,
            completed_at: Utc::now(),
        };

        info!(
            "Pipeline {} finished: {:?} ({} results, {} failed)",
            outcome.pipeline_name,
            outcome.status,
            outcome.results.len(),
            outcome.failed_steps()
        );
        outcome
    }
}
