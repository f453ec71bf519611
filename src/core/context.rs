//! Run context - seed input and the state threaded through one execution

use crate::core::state::StepResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A lorebook entry matched for the current scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LorebookEntry {
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// Seed content and context supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Scene beat instruction
    #[serde(default)]
    pub scene_beat: String,

    /// Text preceding the cursor in the editor
    #[serde(default)]
    pub previous_words: String,

    /// Lorebook entries matched for this scene
    #[serde(default)]
    pub lorebook_entries: Vec<LorebookEntry>,

    #[serde(default)]
    pub chapter_summaries: Option<String>,

    #[serde(default)]
    pub pov_type: Option<String>,

    #[serde(default)]
    pub pov_character: Option<String>,

    #[serde(default)]
    pub story_language: Option<String>,

    /// Free-form data for custom resolvers and condition hooks
    #[serde(default)]
    pub custom_data: HashMap<String, String>,
}

impl PipelineInput {
    /// Create an input from a scene beat and the preceding text
    pub fn new(scene_beat: impl Into<String>, previous_words: impl Into<String>) -> Self {
        Self {
            scene_beat: scene_beat.into(),
            previous_words: previous_words.into(),
            ..Default::default()
        }
    }

    /// Load an input from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse an input from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Number of whitespace-separated words in the previous text
    pub fn word_count(&self) -> usize {
        self.previous_words.split_whitespace().count()
    }
}

/// Mutable state of one pipeline run
///
/// Owned by a single run and never shared; `results` only grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    /// Results in production order
    results: Vec<StepResult>,

    /// Word count of the seed input, fixed for the run
    pub word_count: usize,

    /// Number of matched lorebook entries
    pub lorebook_entry_count: usize,

    /// Output of the most recent successful step
    pub previous_step_output: String,

    /// Jump-backs taken per revision step index
    iteration_counters: BTreeMap<usize, u32>,
}

impl RunContext {
    /// Create a context seeded from the caller's input
    pub fn new(input: &PipelineInput) -> Self {
        Self {
            results: Vec::new(),
            word_count: input.word_count(),
            lorebook_entry_count: input.lorebook_entries.len(),
            previous_step_output: String::new(),
            iteration_counters: BTreeMap::new(),
        }
    }

    /// Append a result
    pub fn push_result(&mut self, result: StepResult) {
        if result.success {
            self.previous_step_output = result.output.clone();
        }
        self.results.push(result);
    }

    /// All results so far
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// The most recent result, if any
    pub fn latest(&self) -> Option<&StepResult> {
        self.results.last()
    }

    /// The most recent result produced by `role` (compared case-insensitively)
    pub fn latest_by_role(&self, role: &str) -> Option<&StepResult> {
        self.results
            .iter()
            .rev()
            .find(|r| r.role.eq_ignore_ascii_case(role))
    }

    /// Jump-backs already taken by the step at `step_index`
    pub fn iterations(&self, step_index: usize) -> u32 {
        self.iteration_counters.get(&step_index).copied().unwrap_or(0)
    }

    /// Record one more jump-back for `step_index`, returning the new count
    pub fn increment_iterations(&mut self, step_index: usize) -> u32 {
        let counter = self.iteration_counters.entry(step_index).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Snapshot of all counters
    pub fn iteration_counters(&self) -> &BTreeMap<usize, u32> {
        &self.iteration_counters
    }

    /// Consume the context, returning its results and counters
    pub fn into_parts(self) -> (Vec<StepResult>, BTreeMap<usize, u32>) {
        (self.results, self.iteration_counters)
    }
}
