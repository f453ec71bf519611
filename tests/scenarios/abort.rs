//! Scenario: aborting a run in progress

use crate::helpers::*;
use prose_pipeline::core::{ExecutionStatus, PipelineInput, PipelineStep};
use prose_pipeline::execution::PipelineExecutor;
use std::sync::Arc;
use std::time::Duration;

fn four_steps() -> Vec<PipelineStep> {
    vec![
        PipelineStep::new("summarizer", 0),
        PipelineStep::new("writer", 1),
        PipelineStep::new("judge", 2),
        PipelineStep::new("editor", 3),
    ]
}

/// Abort during step 2 of 4: nothing after it runs and nothing of it is recorded
#[tokio::test]
async fn test_abort_during_second_step() {
    let invoker = Arc::new(ScriptedInvoker::new().script("writer", vec![Reply::AbortRun]));
    let executor = PipelineExecutor::new(invoker.clone());
    invoker.set_abort_handle(executor.abort_handle());

    let callbacks = RecordingCallbacks::new();
    let outcome = executor
        .execute(&definition(four_steps()), &PipelineInput::new("beat", ""), &callbacks)
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Aborted);
    assert!(outcome.aborted);
    assert_eq!(outcome.trace(), vec![0]);
    assert_eq!(invoker.call_order(), vec!["summarizer", "writer"]);
    assert_eq!(callbacks.started(), vec![0, 1]);
    assert!(!callbacks
        .events()
        .iter()
        .any(|e| matches!(e, Event::Complete { index: 1, .. })));
}

/// An abort only stops runs already in progress
#[tokio::test]
async fn test_executor_runs_again_after_abort() {
    let invoker = Arc::new(ScriptedInvoker::new().script("writer", vec![Reply::AbortRun]));
    let executor = PipelineExecutor::new(invoker.clone());
    invoker.set_abort_handle(executor.abort_handle());
    let def = definition(four_steps());
    let input = PipelineInput::new("beat", "");

    let first = executor.execute(&def, &input, &RecordingCallbacks::new()).await;
    assert_eq!(first.status, ExecutionStatus::Aborted);

    let second = executor.execute(&def, &input, &RecordingCallbacks::new()).await;
    assert_eq!(second.status, ExecutionStatus::Completed);
    assert_eq!(second.trace(), vec![0, 1, 2, 3]);
}

/// Aborting from another task while a run is in flight
#[tokio::test]
async fn test_abort_from_another_task() {
    struct SlowInvoker;

    #[async_trait::async_trait]
    impl prose_pipeline::agent::AgentInvoker for SlowInvoker {
        async fn generate(
            &self,
            _request: &prose_pipeline::agent::GenerationRequest,
            _sink: Option<&dyn prose_pipeline::agent::TokenSink>,
            _cancel: &tokio_util::sync::CancellationToken,
        ) -> Result<prose_pipeline::agent::AgentResponse, prose_pipeline::agent::AgentError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(prose_pipeline::agent::AgentResponse::new("too late"))
        }
    }

    let executor = Arc::new(PipelineExecutor::new(SlowInvoker));
    let handle = executor.abort_handle();
    let run = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .execute(
                    &definition(four_steps()),
                    &PipelineInput::new("beat", ""),
                    &RecordingCallbacks::new(),
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.abort();

    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.status, ExecutionStatus::Aborted);
    assert!(outcome.results.is_empty());
}
