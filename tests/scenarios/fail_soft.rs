//! Scenario: failed steps are recorded and the run carries on

use crate::helpers::*;
use prose_pipeline::core::{ErrorKind, ExecutionStatus, PipelineInput, PipelineStep};
use prose_pipeline::execution::PipelineExecutor;
use std::sync::Arc;

#[tokio::test]
async fn test_middle_failure_is_not_fatal() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("judge", 1),
        PipelineStep::new("critic", 2),
    ]);
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .script("writer", vec![text("Draft text")])
            .script("judge", vec![Reply::Error("rate limited".to_string())]),
    );
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("Tighten it", ""), &callbacks)
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.trace(), vec![0, 1, 2]);
    assert_eq!(outcome.failed_steps(), 1);

    let failed = &outcome.results[1];
    assert!(!failed.success);
    assert!(failed.output.is_empty());
    assert_eq!(failed.error.as_deref(), Some("API error: rate limited"));

    // Failure is reported first, then the failed result is delivered
    let events = callbacks.events();
    let failed_at = events.iter().position(|e| *e == Event::Failed(1)).unwrap();
    assert_eq!(events[failed_at + 1], Event::Complete { index: 1, success: false });

    // The failed step did not replace the previous output
    assert!(invoker.calls()[2].prompt.contains("Previous output:\nDraft text"));
}

#[tokio::test]
async fn test_last_step_failure_fails_the_run() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("editor", 1),
    ]);
    let invoker = Arc::new(
        ScriptedInvoker::new().script("editor", vec![Reply::Error("model overloaded".to_string())]),
    );
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &RecordingCallbacks::new())
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Failed);
    assert_eq!(
        outcome.error,
        Some(ErrorKind::Generation {
            step_index: 1,
            message: "API error: model overloaded".to_string(),
        })
    );
    // Earlier prose is still available to the caller
    assert_eq!(outcome.prose_text, "writer output");
    assert_eq!(outcome.final_text, "writer output");
}

#[tokio::test]
async fn test_failure_before_skipped_last_step() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("judge", 1).with_condition("hasLorebookEntries"),
    ]);
    let invoker =
        Arc::new(ScriptedInvoker::new().script("writer", vec![Reply::Error("boom".to_string())]));
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &RecordingCallbacks::new())
        .await;

    // The failed step was not the last one, so the run completes
    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert_eq!(outcome.failed_steps(), 1);
    assert_eq!(outcome.final_text, "");
}
