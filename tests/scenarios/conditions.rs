//! Scenario: steps gated by run conditions

use crate::helpers::*;
use prose_pipeline::core::{ExecutionStatus, LorebookEntry, PipelineInput, PipelineStep};
use prose_pipeline::execution::PipelineExecutor;
use std::sync::Arc;

fn long_input(words: usize) -> PipelineInput {
    PipelineInput::new("Aria opens the vault", vec!["word"; words].join(" "))
}

/// The summarizer only runs once the story is long enough
#[tokio::test]
async fn test_word_count_gates_summarizer() {
    let steps = || {
        vec![
            PipelineStep::new("summarizer", 0).with_condition("wordCount > 3000"),
            PipelineStep::new("writer", 1),
        ]
    };

    let invoker = Arc::new(ScriptedInvoker::new());
    let executor = PipelineExecutor::new(invoker.clone());
    let callbacks = RecordingCallbacks::new();
    let outcome = executor
        .execute(&definition(steps()), &long_input(3000), &callbacks)
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    assert_eq!(callbacks.skipped(), vec![0]);
    assert_eq!(invoker.call_order(), vec!["writer"]);

    let invoker = Arc::new(ScriptedInvoker::new().script("summarizer", vec![text("A short recap.")]));
    let executor = PipelineExecutor::new(invoker.clone());
    let outcome = executor
        .execute(&definition(steps()), &long_input(3001), &RecordingCallbacks::new())
        .await;

    assert_eq!(outcome.trace(), vec![0, 1]);
    // The writer works from the summary instead of the raw text
    let writer_prompt = &invoker.calls()[1].prompt;
    assert!(writer_prompt.contains("STORY CONTEXT:\nA short recap."));
}

/// The judge is skipped when no lore matched the scene
#[tokio::test]
async fn test_lorebook_gate() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("judge", 1).with_condition("hasLorebookEntries"),
    ]);

    let invoker = Arc::new(ScriptedInvoker::new());
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", "text"), &RecordingCallbacks::new())
        .await;
    assert_eq!(outcome.trace(), vec![0]);

    let mut input = PipelineInput::new("beat", "text");
    input.lorebook_entries.push(LorebookEntry {
        name: "Aria".to_string(),
        category: Some("character".to_string()),
        description: "A thief with green eyes".to_string(),
    });
    let invoker = Arc::new(ScriptedInvoker::new());
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &input, &RecordingCallbacks::new())
        .await;
    assert_eq!(outcome.trace(), vec![0, 1]);
    assert!(invoker.calls()[1].prompt.contains("[CHARACTER] Aria:"));
}

/// Validation keywords match the previous output case-insensitively
#[tokio::test]
async fn test_keyword_gate() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("editor", 1)
            .with_condition("outputContainsAnyKeyword")
            .with_keywords(["dragon", "sword"]),
    ]);

    let invoker = Arc::new(
        ScriptedInvoker::new().script("writer", vec![text("A DRAGON circled the keep.")]),
    );
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &RecordingCallbacks::new())
        .await;
    assert_eq!(outcome.trace(), vec![0, 1]);

    let invoker =
        Arc::new(ScriptedInvoker::new().script("writer", vec![text("Only rain tonight.")]));
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &callbacks)
        .await;
    assert_eq!(outcome.trace(), vec![0]);
    assert_eq!(callbacks.skipped(), vec![1]);
}

/// The editor only runs when a judge reported an issue
#[tokio::test]
async fn test_judge_issue_gate() {
    let def = definition(vec![
        PipelineStep::new("writer", 0),
        PipelineStep::new("judge", 1),
        PipelineStep::new("editor", 2).with_condition("anyJudgeFoundIssues"),
    ]);

    let invoker = Arc::new(ScriptedInvoker::new().script("judge", vec![text("CONSISTENT")]));
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &RecordingCallbacks::new())
        .await;
    assert_eq!(outcome.trace(), vec![0, 1]);
    assert_eq!(outcome.final_text, "CONSISTENT");
    assert_eq!(outcome.prose_text, "writer output");

    let invoker = Arc::new(
        ScriptedInvoker::new().script("judge", vec![text("ISSUE: the moon was full yesterday")]),
    );
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &PipelineInput::new("beat", ""), &RecordingCallbacks::new())
        .await;
    assert_eq!(outcome.trace(), vec![0, 1, 2]);
    assert_eq!(outcome.prose_text, "editor output");
}
