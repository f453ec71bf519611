//! CLI command definitions

use crate::core::{EngineSettings, PipelineConfig, PipelineDefinition};
use crate::presets::{self, PresetStore};
use anyhow::{bail, Context, Result};
use clap::Args;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long, required_unless_present = "preset")]
    pub file: Option<String>,

    /// Path to the input YAML file (scene beat, previous words, lorebook)
    #[arg(short, long)]
    pub input: String,

    /// Run a stored pipeline preset by name instead of a file
    #[arg(short, long, conflicts_with = "file")]
    pub preset: Option<String>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,

    /// Model command to invoke for every step
    #[arg(long)]
    pub program: Option<String>,
}

impl RunCommand {
    /// Build the definition to run and the engine settings that go with it
    ///
    /// Agents a pipeline file does not declare are looked up among the
    /// stored agent presets.
    pub async fn definition(
        &self,
        store: &dyn PresetStore,
    ) -> Result<(PipelineDefinition, EngineSettings)> {
        if let Some(file) = &self.file {
            let config = PipelineConfig::from_file(file)
                .with_context(|| format!("Failed to load pipeline config {}", file))?;
            let stored = store.list_agents().await?.into_iter().map(|p| p.agent);
            let definition = config
                .to_definition_with(stored)
                .with_context(|| format!("Pipeline '{}' is not runnable", config.name))?;
            return Ok((definition, config.engine));
        }

        let Some(name) = &self.preset else {
            bail!("Either --file or --preset is required");
        };
        let preset = presets::find_pipeline(store, name)
            .await?
            .with_context(|| format!("No pipeline preset named '{}'", name))?;
        let definition = presets::resolve_definition(store, &preset).await?;
        Ok((definition, EngineSettings::default()))
    }
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the built-in pipeline presets
#[derive(Debug, Args, Clone)]
pub struct PresetsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
