//! Pipeline domain model

use crate::core::{
    agent::AgentConfig,
    condition::Condition,
    error::DefinitionError,
    step::PipelineStep,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A step resolved against its agent, with its condition parsed
#[derive(Debug, Clone)]
pub struct ExecutableStep {
    /// Position in the sorted step list
    pub index: usize,

    pub step: PipelineStep,

    pub agent: Arc<AgentConfig>,

    pub condition: Condition,
}

/// A validated, ordered pipeline ready to execute
///
/// Built once and shared read-only between runs.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    /// Pipeline name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    steps: Vec<ExecutableStep>,
}

impl PipelineDefinition {
    /// Validate steps against agents and build the definition
    ///
    /// Steps are sorted by `order`; indices used by `retry_from_step` refer to
    /// positions in the sorted list.
    pub fn build<I>(
        name: impl Into<String>,
        steps: Vec<PipelineStep>,
        agents: I,
    ) -> Result<Self, DefinitionError>
    where
        I: IntoIterator<Item = AgentConfig>,
    {
        let name = name.into();
        if steps.is_empty() {
            return Err(DefinitionError::Empty(name));
        }

        let agents: HashMap<String, Arc<AgentConfig>> = agents
            .into_iter()
            .map(|a| (a.id.clone(), Arc::new(a)))
            .collect();

        let mut steps = steps;
        steps.sort_by_key(|s| s.order);

        let mut seen_orders = HashSet::new();
        for step in &steps {
            if !seen_orders.insert(step.order) {
                return Err(DefinitionError::DuplicateOrder(step.order));
            }
        }

        let mut executable = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            let agent = agents
                .get(&step.agent_config_id)
                .cloned()
                .ok_or_else(|| DefinitionError::UnknownAgent {
                    step_index: index,
                    agent_id: step.agent_config_id.clone(),
                })?;

            if let Some(field) = step.stray_revision_field() {
                return Err(DefinitionError::RevisionFieldOnNonRevision {
                    step_index: index,
                    field,
                });
            }

            if let Some(retry_from_step) = step.retry_from_step {
                if retry_from_step >= index {
                    return Err(DefinitionError::RetryOutOfRange {
                        step_index: index,
                        retry_from_step,
                    });
                }
            }

            let condition = Condition::parse(step.condition.as_deref()).map_err(|source| {
                DefinitionError::InvalidCondition {
                    step_index: index,
                    source,
                }
            })?;

            executable.push(ExecutableStep {
                index,
                step,
                agent,
                condition,
            });
        }

        Ok(Self {
            name,
            description: None,
            steps: executable,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[ExecutableStep] {
        &self.steps
    }

    /// Get a step by index
    pub fn step(&self, index: usize) -> Option<&ExecutableStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check if any step loops back
    pub fn has_revision_loops(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.step.is_revision && s.step.retry_from_step.is_some())
    }
}
