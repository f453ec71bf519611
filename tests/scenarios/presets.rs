//! Scenario: running the built-in presets end to end

use crate::helpers::*;
use prose_pipeline::core::{ExecutionStatus, LorebookEntry, PipelineInput};
use prose_pipeline::execution::PipelineExecutor;
use prose_pipeline::presets::{
    find_pipeline, resolve_definition, InMemoryPresetStore, PresetSeeder, PresetStore,
};
use std::sync::Arc;

async fn seeded() -> Arc<dyn PresetStore> {
    let seeder = PresetSeeder::new(Arc::new(InMemoryPresetStore::new()));
    seeder.ensure_seeded().await.unwrap();
    seeder.store().clone()
}

fn scene() -> PipelineInput {
    let mut input = PipelineInput::new("Aria confronts the duke", "The hall was silent.");
    input.lorebook_entries.push(LorebookEntry {
        name: "Aria".to_string(),
        category: Some("character".to_string()),
        description: "Green-eyed thief".to_string(),
    });
    input
}

#[tokio::test]
async fn test_revision_preset_revises_once_on_issue() {
    let store = seeded().await;
    let preset = find_pipeline(store.as_ref(), "Quality Prose with Revision")
        .await
        .unwrap()
        .unwrap();
    let def = resolve_definition(store.as_ref(), &preset).await.unwrap();

    let invoker = Arc::new(
        ScriptedInvoker::new()
            .script(
                "system:prose_writer",
                vec![text("Aria's blue eyes flashed."), text("Aria's green eyes flashed.")],
            )
            .script("system:lore_judge", vec![text("ISSUE: Aria has green eyes")]),
    );
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &scene(), &callbacks)
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    // Short story: the summarizer is skipped and the revision runs once
    assert_eq!(callbacks.skipped(), vec![0]);
    assert_eq!(outcome.trace(), vec![1, 2, 3]);
    assert_eq!(outcome.prose_text, "Aria's green eyes flashed.");
    assert_eq!(
        callbacks.streamed_text(),
        "Aria's blue eyes flashed.Aria's green eyes flashed."
    );
}

#[tokio::test]
async fn test_revision_preset_skips_revision_when_consistent() {
    let store = seeded().await;
    let preset = find_pipeline(store.as_ref(), "quality prose with revision")
        .await
        .unwrap()
        .unwrap();
    let def = resolve_definition(store.as_ref(), &preset).await.unwrap();

    let invoker = Arc::new(ScriptedInvoker::new().script("system:lore_judge", vec![text("CONSISTENT")]));
    let callbacks = RecordingCallbacks::new();
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &scene(), &callbacks)
        .await;

    assert_eq!(outcome.trace(), vec![1, 2]);
    assert_eq!(callbacks.skipped(), vec![0, 3]);
    assert_eq!(outcome.prose_text, "system:prose_writer output");
    assert_eq!(outcome.final_text, "CONSISTENT");
}

#[tokio::test]
async fn test_dialogue_polish_preset() {
    let store = seeded().await;
    let preset = find_pipeline(store.as_ref(), "Dialogue Polish").await.unwrap().unwrap();
    let def = resolve_definition(store.as_ref(), &preset).await.unwrap();

    let invoker = Arc::new(ScriptedInvoker::new().script(
        "system:prose_writer",
        vec![text("\"Leave,\" said the duke.")],
    ));
    let outcome = PipelineExecutor::new(invoker.clone())
        .execute(&def, &scene(), &RecordingCallbacks::new())
        .await;

    assert_eq!(outcome.status, ExecutionStatus::Completed);
    let specialist = &invoker.calls()[1];
    assert_eq!(specialist.role, "dialogue_specialist");
    assert!(specialist.prompt.contains("PROSE:\n\"Leave,\" said the duke."));
    // The system prompt travels with the request
    assert!(specialist.prompt.contains("You are a dialogue specialist"));
}
