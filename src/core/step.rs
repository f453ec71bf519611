//! Step domain model

use serde::{Deserialize, Serialize};

/// One entry in a pipeline: which agent runs, when, and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// Agent config this step runs
    pub agent_config_id: String,

    /// Position in the pipeline; steps are sorted by this value
    pub order: u32,

    /// Run condition (absent means always run)
    #[serde(default)]
    pub condition: Option<String>,

    /// Forward tokens to the caller while generating
    #[serde(default)]
    pub stream_output: bool,

    /// Run with a revision instruction and possibly loop back
    #[serde(default)]
    pub is_revision: bool,

    /// Maximum jump-backs for a revision step (defaults to 1)
    #[serde(default)]
    pub max_iterations: Option<u32>,

    /// Index of the earlier step to resume from when revising
    #[serde(default)]
    pub retry_from_step: Option<usize>,

    /// Revision instruction template
    #[serde(default)]
    pub push_prompt: Option<String>,

    /// Keywords checked by `outputContainsAnyKeyword`
    #[serde(default)]
    pub validation_keywords: Vec<String>,

    /// Timeout for this step (overrides the engine default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PipelineStep {
    pub fn new(agent_config_id: impl Into<String>, order: u32) -> Self {
        Self {
            agent_config_id: agent_config_id.into(),
            order,
            condition: None,
            stream_output: false,
            is_revision: false,
            max_iterations: None,
            retry_from_step: None,
            push_prompt: None,
            validation_keywords: Vec::new(),
            timeout_secs: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream_output = true;
        self
    }

    /// Mark as a revision step looping back to `retry_from_step`
    pub fn revision(mut self, retry_from_step: usize, max_iterations: u32) -> Self {
        self.is_revision = true;
        self.retry_from_step = Some(retry_from_step);
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_push_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.push_prompt = Some(prompt.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Effective jump-back ceiling
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations.unwrap_or(1)
    }

    /// Name of the first revision-only field set on a non-revision step
    pub(crate) fn stray_revision_field(&self) -> Option<&'static str> {
        if self.is_revision {
            return None;
        }
        if self.max_iterations.is_some() {
            Some("max_iterations")
        } else if self.retry_from_step.is_some() {
            Some("retry_from_step")
        } else if self.push_prompt.is_some() {
            Some("push_prompt")
        } else {
            None
        }
    }
}
