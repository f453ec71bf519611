//! Agent and pipeline presets
//!
//! Presets are stored agents and pipelines a caller can run by name. The
//! built-in system presets are seeded once per store through [`PresetSeeder`],
//! whose initialization is shared by concurrent callers.

pub mod builtin;

use crate::core::{AgentConfig, PipelineDefinition, PipelineStep};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

pub use builtin::{system_agent_id, system_agents, system_pipelines};

/// A stored agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPreset {
    #[serde(flatten)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub description: String,

    /// Seeded by the application rather than created by a user
    #[serde(default)]
    pub is_system: bool,
}

/// A stored pipeline whose steps reference agent presets by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePreset {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub steps: Vec<PipelineStep>,

    #[serde(default)]
    pub is_system: bool,
}

/// Trait for preset storage
#[async_trait::async_trait]
pub trait PresetStore: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<AgentPreset>>;

    async fn get_agent(&self, id: &str) -> Result<Option<AgentPreset>>;

    async fn save_agent(&self, preset: &AgentPreset) -> Result<()>;

    async fn delete_agent(&self, id: &str) -> Result<()>;

    async fn list_pipelines(&self) -> Result<Vec<PipelinePreset>>;

    async fn save_pipeline(&self, preset: &PipelinePreset) -> Result<()>;

    async fn delete_pipeline(&self, id: &str) -> Result<()>;
}

/// In-memory preset store (for testing or ephemeral use)
///
/// Listing preserves insertion order.
#[derive(Default)]
pub struct InMemoryPresetStore {
    agents: RwLock<Vec<AgentPreset>>,
    pipelines: RwLock<Vec<PipelinePreset>>,
}

impl InMemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PresetStore for InMemoryPresetStore {
    async fn list_agents(&self) -> Result<Vec<AgentPreset>> {
        Ok(self.agents.read().await.clone())
    }

    async fn get_agent(&self, id: &str) -> Result<Option<AgentPreset>> {
        let agents = self.agents.read().await;
        Ok(agents.iter().find(|a| a.agent.id == id).cloned())
    }

    async fn save_agent(&self, preset: &AgentPreset) -> Result<()> {
        let mut agents = self.agents.write().await;
        match agents.iter_mut().find(|a| a.agent.id == preset.agent.id) {
            Some(existing) => *existing = preset.clone(),
            None => agents.push(preset.clone()),
        }
        Ok(())
    }

    async fn delete_agent(&self, id: &str) -> Result<()> {
        self.agents.write().await.retain(|a| a.agent.id != id);
        Ok(())
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelinePreset>> {
        Ok(self.pipelines.read().await.clone())
    }

    async fn save_pipeline(&self, preset: &PipelinePreset) -> Result<()> {
        let mut pipelines = self.pipelines.write().await;
        match pipelines.iter_mut().find(|p| p.id == preset.id) {
            Some(existing) => *existing = preset.clone(),
            None => pipelines.push(preset.clone()),
        }
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<()> {
        self.pipelines.write().await.retain(|p| p.id != id);
        Ok(())
    }
}

/// What a seeding pass created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub agents_created: usize,
    pub pipelines_created: usize,
}

/// Seeds the system presets into a store exactly once
///
/// Concurrent callers of [`PresetSeeder::ensure_seeded`] await the same
/// initialization. A failed attempt leaves the cell empty so a later call
/// retries.
pub struct PresetSeeder {
    store: Arc<dyn PresetStore>,
    seeded: OnceCell<SeedReport>,
}

impl PresetSeeder {
    pub fn new(store: Arc<dyn PresetStore>) -> Self {
        Self {
            store,
            seeded: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn PresetStore> {
        &self.store
    }

    /// Seed the system presets if this seeder has not done so yet
    pub async fn ensure_seeded(&self) -> Result<&SeedReport> {
        self.seeded
            .get_or_try_init(|| seed_system_presets(self.store.as_ref()))
            .await
    }
}

/// Insert system agents and pipelines missing from the store, matched by name
pub async fn seed_system_presets(store: &dyn PresetStore) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let existing_agents: HashSet<String> = store
        .list_agents()
        .await?
        .into_iter()
        .filter(|a| a.is_system)
        .map(|a| a.agent.name)
        .collect();

    for preset in system_agents() {
        if existing_agents.contains(&preset.agent.name) {
            debug!("Agent already exists: {}", preset.agent.name);
            continue;
        }
        store
            .save_agent(&preset)
            .await
            .with_context(|| format!("Failed to seed agent {}", preset.agent.name))?;
        report.agents_created += 1;
        info!("Created system agent: {}", preset.agent.name);
    }

    let existing_pipelines: HashSet<String> = store
        .list_pipelines()
        .await?
        .into_iter()
        .filter(|p| p.is_system)
        .map(|p| p.name)
        .collect();

    for preset in system_pipelines() {
        if existing_pipelines.contains(&preset.name) {
            debug!("Pipeline already exists: {}", preset.name);
            continue;
        }
        store
            .save_pipeline(&preset)
            .await
            .with_context(|| format!("Failed to seed pipeline {}", preset.name))?;
        report.pipelines_created += 1;
        info!("Created system pipeline: {}", preset.name);
    }

    info!(
        "Seeding complete ({} agents, {} pipelines created)",
        report.agents_created, report.pipelines_created
    );
    Ok(report)
}

/// Remove duplicate system presets, keeping the first of each name
pub async fn remove_duplicate_system_presets(store: &dyn PresetStore) -> Result<(usize, usize)> {
    let mut seen = HashSet::new();
    let mut agents_removed = 0;
    for preset in store.list_agents().await?.into_iter().filter(|a| a.is_system) {
        if !seen.insert(preset.agent.name.clone()) {
            store.delete_agent(&preset.agent.id).await?;
            agents_removed += 1;
            info!("Removed duplicate agent: {}", preset.agent.name);
        }
    }

    let mut seen = HashSet::new();
    let mut pipelines_removed = 0;
    for preset in store.list_pipelines().await?.into_iter().filter(|p| p.is_system) {
        if !seen.insert(preset.name.clone()) {
            store.delete_pipeline(&preset.id).await?;
            pipelines_removed += 1;
            info!("Removed duplicate pipeline: {}", preset.name);
        }
    }

    Ok((agents_removed, pipelines_removed))
}

/// Find a pipeline preset by name (case-insensitive)
pub async fn find_pipeline(store: &dyn PresetStore, name: &str) -> Result<Option<PipelinePreset>> {
    Ok(store
        .list_pipelines()
        .await?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name)))
}

/// Build a definition for a stored pipeline, resolving its agents from the store
pub async fn resolve_definition(
    store: &dyn PresetStore,
    preset: &PipelinePreset,
) -> Result<PipelineDefinition> {
    let agents: HashMap<String, AgentConfig> = store
        .list_agents()
        .await?
        .into_iter()
        .map(|p| (p.agent.id.clone(), p.agent))
        .collect();

    let definition = PipelineDefinition::build(
        preset.name.clone(),
        preset.steps.clone(),
        agents.into_values(),
    )
    .with_context(|| format!("Preset '{}' is not runnable", preset.name))?;

    Ok(definition.with_description(preset.description.clone()))
}
