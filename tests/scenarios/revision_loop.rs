//! Scenario: revision steps looping back to an earlier step

use crate::helpers::*;
use prose_pipeline::core::{ExecutionStatus, PipelineInput, PipelineStep};
use prose_pipeline::execution::PipelineExecutor;
use std::sync::Arc;

const ISSUE: &str = "ISSUE: Aria's eyes are green, not blue";

/// writer -> judge -> revising writer that returns to the judge
fn revising_pipeline(max_iterations: u32) -> Vec<PipelineStep> {
    vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("judge", 1),
        PipelineStep::new("writer", 2)
            .with_condition("roleOutputContains:lore_judge:ISSUE")
            .revision(1, max_iterations),
    ]
}

fn always_issues() -> ScriptedInvoker {
    ScriptedInvoker::new().script("judge", vec![text(ISSUE); 10])
}

#[tokio::test]
async fn test_loop_trace() {
    let invoker = Arc::new(always_issues());
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(
            &definition(revising_pipeline(2)),
            &PipelineInput::new("Aria meets the duke", ""),
            &callbacks,
        )
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert_eq!(outcome.trace(), vec![0, 1, 2, 1, 2, 1, 2]);
    assert_eq!(outcome.iterations.get(&2), Some(&2));

    let revisions: Vec<_> = callbacks
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Revision { .. }))
        .collect();
    assert_eq!(
        revisions,
        vec![
            Event::Revision { from: 2, to: 1, iteration: 1 },
            Event::Revision { from: 2, to: 1, iteration: 2 },
        ]
    );

    let attempts: Vec<_> = outcome
        .results
        .iter()
        .filter(|r| r.step_index == 2)
        .map(|r| (r.is_revision, r.iteration))
        .collect();
    assert_eq!(attempts, vec![(true, 0), (true, 1), (true, 2)]);
}

/// A revision step is visited at most `max_iterations + 1` times
#[tokio::test]
async fn test_loop_terminates() {
    for k in 0..=4 {
        let invoker = Arc::new(always_issues());
        let outcome = PipelineExecutor::new(invoker.clone())
            .execute(
                &definition(revising_pipeline(k)),
                &PipelineInput::new("beat", ""),
                &RecordingCallbacks::new(),
            )
            .await;

        assert_eq!(outcome.status, ExecutionStatus::Completed);
        assert_eq!(outcome.visits(2), k as usize + 1, "max_iterations = {}", k);
        assert_eq!(outcome.visits(0), 1);
        if k == 0 {
            assert_eq!(outcome.trace(), vec![0, 1, 2]);
            assert_eq!(outcome.iterations.get(&2).copied().unwrap_or(0), 0);
        }
    }
}

/// The loop stops as soon as the judge is satisfied
#[tokio::test]
async fn test_loop_stops_when_judge_is_satisfied() {
    let invoker = Arc::new(
        ScriptedInvoker::new().script("judge", vec![text(ISSUE), text("CONSISTENT")]),
    );
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(
            &definition(revising_pipeline(5)),
            &PipelineInput::new("beat", ""),
            &callbacks,
        )
        .await;

    // The second judge pass clears the gate, so the revision is skipped
    assert_eq!(outcome.trace(), vec![0, 1, 2, 1]);
    assert_eq!(callbacks.skipped(), vec![2]);
    assert_eq!(outcome.iterations.get(&2), Some(&1));
}

/// Without a push prompt the revision carries the prose and all judge feedback
#[tokio::test]
async fn test_default_revision_instruction() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .script("writer", vec![text("Aria's blue eyes narrowed."), text("Aria's green eyes narrowed.")])
            .script("judge", vec![text(ISSUE), text("CONSISTENT")]),
    );
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(
            &definition(revising_pipeline(1)),
            &PipelineInput::new("Aria meets the duke", ""),
            &RecordingCallbacks::new(),
        )
        .await;

    let revision_call = &invoker.calls()[2];
    assert_eq!(revision_call.agent_id, "writer");
    assert!(revision_call.prompt.contains("You need to REVISE"));
    assert!(revision_call.prompt.contains("ORIGINAL SCENE BEAT INSTRUCTION:\nAria meets the duke"));
    assert!(revision_call.prompt.contains("ORIGINAL PROSE:\nAria's blue eyes narrowed."));
    assert!(revision_call.prompt.contains(&format!("[LORE_JUDGE FEEDBACK]:\n{}", ISSUE)));

    assert_eq!(outcome.prose_text, "Aria's green eyes narrowed.");

    // Each result keeps the messages its step was sent
    let revision = outcome
        .results
        .iter()
        .find(|r| r.step_index == 2)
        .expect("revision result");
    let sent = revision.prompt_sent.as_ref().expect("prompt recorded");
    assert!(sent.user_text().contains("You need to REVISE"));
    assert_eq!(sent.render(), revision_call.prompt);
    assert!(outcome.results.iter().all(|r| r.prompt_sent.is_some()));
}

/// Push prompts substitute the previous output and the latest judge feedback
#[tokio::test]
async fn test_push_prompt_revision() {
    let mut steps = revising_pipeline(1);
    steps[2] = steps[2]
        .clone()
        .with_push_prompt("Feedback:\n{{FEEDBACK}}\n\nRewrite:\n{{PREVIOUS_OUTPUT}}");

    let invoker = Arc::new(
        ScriptedInvoker::new()
            .script("writer", vec![text("Draft one.")])
            .script("judge", vec![text(ISSUE), text("CONSISTENT")]),
    );
    PipelineExecutor::new(invoker.clone())
        .execute(&definition(steps), &PipelineInput::new("beat", ""), &RecordingCallbacks::new())
        .await;

    let prompt = &invoker.calls()[2].prompt;
    // The judge ran last, so its output is also the previous output
    assert!(prompt.contains(&format!("Feedback:\n{}\n\nRewrite:\n{}", ISSUE, ISSUE)));
    assert!(!prompt.contains("{{"));
}
