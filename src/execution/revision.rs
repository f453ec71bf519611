//! Revision loops
//!
//! A revision step runs with an instruction built from the latest prose and
//! judge feedback. After each attempt its condition is checked again; while it
//! still holds and the step has jump-backs left, the cursor moves back to
//! `retry_from_step`. Counters live in the [`RunContext`] and are never reset,
//! so a revision step is visited at most `max_iterations + 1` times.

use crate::core::{
    last_prose_output, ConditionEvaluator, ExecutableStep, PipelineInput, RunContext,
};
use tracing::{debug, info};

/// Placeholder replaced with the previous step's output
pub const PREVIOUS_OUTPUT_PLACEHOLDER: &str = "{{PREVIOUS_OUTPUT}}";

/// Placeholder replaced with the most recent judge feedback
pub const FEEDBACK_PLACEHOLDER: &str = "{{FEEDBACK}}";

/// Where a revision step stands in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionState {
    /// No jump-back taken yet
    InitialRun,
    /// Inside the loop, after `iteration` jump-backs
    RetryWindow { iteration: u32 },
    /// Ceiling reached; the next attempt is the last
    Done,
}

/// What the executor does after a revision attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionDecision {
    /// Continue with the next step
    Advance,
    /// Move the cursor back to `to`
    JumpBack { to: usize, iteration: u32 },
}

/// Decides revision instructions and jump-backs
#[derive(Debug, Clone, Copy)]
pub struct RevisionController<'a> {
    evaluator: &'a ConditionEvaluator,
}

impl<'a> RevisionController<'a> {
    pub fn new(evaluator: &'a ConditionEvaluator) -> Self {
        Self { evaluator }
    }

    /// Current loop state for a step
    pub fn state(&self, step: &ExecutableStep, ctx: &RunContext) -> RevisionState {
        let taken = ctx.iterations(step.index);
        if taken >= step.step.max_iterations() {
            RevisionState::Done
        } else if taken == 0 {
            RevisionState::InitialRun
        } else {
            RevisionState::RetryWindow { iteration: taken }
        }
    }

    /// Instruction for the next attempt of a revision step
    pub fn instruction(&self, step: &ExecutableStep, ctx: &RunContext, input: &PipelineInput) -> String {
        match &step.step.push_prompt {
            Some(template) => {
                let feedback = ctx
                    .results()
                    .iter()
                    .rev()
                    .find(|r| r.success && self.evaluator.is_judge_role(&r.role))
                    .map(|r| r.output.as_str())
                    .unwrap_or("");
                template
                    .replace(PREVIOUS_OUTPUT_PLACEHOLDER, &ctx.previous_step_output)
                    .replace(FEEDBACK_PLACEHOLDER, feedback)
            }
            None => self.default_instruction(ctx, input),
        }
    }

    fn default_instruction(&self, ctx: &RunContext, input: &PipelineInput) -> String {
        let prose = last_prose_output(ctx.results());
        let feedback = ctx
            .results()
            .iter()
            .filter(|r| r.success && self.evaluator.is_judge_role(&r.role))
            .map(|r| format!("[{} FEEDBACK]:\n{}", r.role.to_uppercase(), r.output))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut message =
            String::from("You need to REVISE the following prose based on the feedback provided.\n\n");
        message.push_str(&format!("ORIGINAL SCENE BEAT INSTRUCTION:\n{}\n\n", input.scene_beat));
        message.push_str(&format!("---\nORIGINAL PROSE:\n{}\n\n", prose));
        if !feedback.is_empty() {
            message.push_str(&format!("---\n{}\n\n", feedback));
        }
        message.push_str(
            "---\nPlease rewrite the prose, addressing ALL the issues mentioned in the feedback \
             while maintaining the original intent and style. Output ONLY the revised prose:",
        );
        message
    }

    /// Decide what happens after the latest attempt of `step`
    ///
    /// Records the jump-back in `ctx` when one is taken.
    pub fn after_attempt(&self, step: &ExecutableStep, ctx: &mut RunContext) -> RevisionDecision {
        let succeeded = ctx
            .latest()
            .map(|r| r.step_index == step.index && r.success)
            .unwrap_or(false);
        if !succeeded {
            debug!("Revision step {} failed; not looping", step.index);
            return RevisionDecision::Advance;
        }

        let Some(to) = step.step.retry_from_step else {
            return RevisionDecision::Advance;
        };

        if !self
            .evaluator
            .evaluate(&step.condition, &step.step.validation_keywords, ctx)
        {
            debug!("Revision step {} condition cleared", step.index);
            return RevisionDecision::Advance;
        }

        let max = step.step.max_iterations();
        if ctx.iterations(step.index) >= max {
            info!(
                "Revision step {} reached its ceiling of {} iteration(s)",
                step.index, max
            );
            return RevisionDecision::Advance;
        }

        let iteration = ctx.increment_iterations(step.index);
        info!(
            "Revision step {} looping back to step {} (iteration {}/{})",
            step.index, to, iteration, max
        );
        RevisionDecision::JumpBack { to, iteration }
    }
}
