//! Scenario: token streaming through the callbacks

use crate::helpers::*;
use prose_pipeline::core::{PipelineInput, PipelineStep};
use prose_pipeline::execution::PipelineExecutor;
use std::sync::Arc;

/// Tokens of a streaming step arrive in order, between its start and completion
#[tokio::test]
async fn test_tokens_arrive_in_order_within_step() {
    let def = definition(vec![
        PipelineStep::new("writer", 0).streaming(),
        PipelineStep::new("judge", 1),
    ]);
    let invoker = Arc::new(
        ScriptedInvoker::new().script("writer", vec![text("The lantern guttered and died.")]),
    );
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &callbacks)
        .await;

    assert_eq!(callbacks.streamed_text(), "The lantern guttered and died.");
    assert_eq!(outcome.results[0].output, callbacks.streamed_text());

    let events = callbacks.events();
    let start = events.iter().position(|e| *e == Event::Start(0)).unwrap();
    let complete = events
        .iter()
        .position(|e| *e == Event::Complete { index: 0, success: true })
        .unwrap();
    let tokens: Vec<_> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Event::Token(_)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(tokens.len(), 5);
    assert!(tokens.iter().all(|&i| start < i && i < complete));
}

/// Steps without `stream_output` never reach the token callback
#[tokio::test]
async fn test_non_streaming_steps_stay_quiet() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("editor", 1).streaming(),
    ]);
    let invoker = Arc::new(ScriptedInvoker::new().script("editor", vec![text("Polished prose.")]));
    let callbacks = RecordingCallbacks::new();
    PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &callbacks)
        .await;

    assert_eq!(callbacks.streamed_text(), "Polished prose.");
    let streamed: Vec<_> = invoker.calls().into_iter().map(|c| c.streamed).collect();
    assert_eq!(streamed, vec![false, true]);
}
