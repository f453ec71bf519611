//! Pipeline configuration from YAML

use crate::core::{
    agent::{roles, AgentConfig},
    condition::{Condition, ConditionEvaluator},
    error::DefinitionError,
    pipeline::PipelineDefinition,
    step::PipelineStep,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Agents defined inline; steps may also reference preset agents
    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    /// Pipeline steps
    #[serde(default)]
    pub steps: Vec<PipelineStep>,

    /// Engine behaviour for runs of this pipeline
    #[serde(default)]
    pub engine: EngineSettings,
}

/// Engine settings shared by every step of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Roles whose output counts as judge feedback
    #[serde(default = "default_judge_roles")]
    pub judge_roles: Vec<String>,

    /// Case-sensitive markers a judge uses to report problems
    #[serde(default = "default_issue_markers")]
    pub issue_markers: Vec<String>,

    /// Default timeout for one generation (in seconds)
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_judge_roles() -> Vec<String> {
    roles::DEFAULT_JUDGE_ROLES.iter().map(|r| r.to_string()).collect()
}

fn default_issue_markers() -> Vec<String> {
    vec!["ISSUE".to_string()]
}

fn default_step_timeout_secs() -> u64 {
    300
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            judge_roles: default_judge_roles(),
            issue_markers: default_issue_markers(),
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

impl EngineSettings {
    /// Condition evaluator configured with these judge roles and markers
    pub fn evaluator(&self) -> ConditionEvaluator {
        ConditionEvaluator::new(self.judge_roles.clone(), self.issue_markers.clone())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid pipeline file {}", path.display()))
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate what can be checked without preset agents
    ///
    /// Agent resolution happens in [`PipelineConfig::to_definition_with`],
    /// since steps may reference preset agents not listed here.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        let mut seen_ids = HashSet::new();
        for agent in &self.agents {
            if agent.id.trim().is_empty() {
                anyhow::bail!("Agent '{}' has an empty id", agent.name);
            }
            if !seen_ids.insert(&agent.id) {
                anyhow::bail!("Duplicate agent ID: {}", agent.id);
            }
        }

        for step in &self.steps {
            Condition::parse(step.condition.as_deref())
                .with_context(|| format!("Step with order {} has a bad condition", step.order))?;
        }

        if self.engine.judge_roles.is_empty() {
            tracing::warn!(
                "Pipeline '{}' has no judge roles; anyJudgeFoundIssues never holds",
                self.name
            );
        }

        Ok(())
    }

    /// Build a definition from inline agents only
    pub fn to_definition(&self) -> Result<PipelineDefinition, DefinitionError> {
        self.to_definition_with(std::iter::empty())
    }

    /// Build a definition, resolving missing agents from `fallback`
    ///
    /// Inline agents win over fallback agents with the same id.
    pub fn to_definition_with<I>(&self, fallback: I) -> Result<PipelineDefinition, DefinitionError>
    where
        I: IntoIterator<Item = AgentConfig>,
    {
        let mut agents: HashMap<String, AgentConfig> = fallback
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        for agent in &self.agents {
            agents.insert(agent.id.clone(), agent.clone());
        }

        let definition =
            PipelineDefinition::build(self.name.clone(), self.steps.clone(), agents.into_values())?;
        Ok(match &self.description {
            Some(description) => definition.with_description(description.clone()),
            None => definition,
        })
    }
}
