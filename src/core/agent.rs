//! Agent configuration - role, model and prompt bundle referenced by steps

use serde::{Deserialize, Serialize};

/// Well-known role names used by the built-in presets and prompt resolver
pub mod roles {
    pub const SUMMARIZER: &str = "summarizer";
    pub const PROSE_WRITER: &str = "prose_writer";
    pub const LORE_JUDGE: &str = "lore_judge";
    pub const CONTINUITY_CHECKER: &str = "continuity_checker";
    pub const STYLE_EDITOR: &str = "style_editor";
    pub const DIALOGUE_SPECIALIST: &str = "dialogue_specialist";
    pub const EXPANDER: &str = "expander";
    pub const REFUSAL_CHECKER: &str = "refusal_checker";
    pub const CUSTOM: &str = "custom";

    /// Roles whose output is the prose the writer keeps
    pub const PROSE_ROLES: &[&str] = &[PROSE_WRITER, STYLE_EDITOR, DIALOGUE_SPECIALIST, EXPANDER];

    /// Roles treated as judges unless the engine is configured otherwise
    pub const DEFAULT_JUDGE_ROLES: &[&str] = &[LORE_JUDGE, CONTINUITY_CHECKER, REFUSAL_CHECKER];

    /// Check if a role produces prose
    pub fn is_prose_role(role: &str) -> bool {
        PROSE_ROLES.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Reference to the model an agent generates with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Provider-specific model identifier
    pub id: String,

    /// Provider name (e.g. "openrouter", "local")
    #[serde(default)]
    pub provider: String,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            name: None,
        }
    }
}

/// Context-assembly rules for an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How many matched lorebook entries are passed to the agent
    #[serde(default = "default_lorebook_entry_limit")]
    pub lorebook_entry_limit: usize,

    /// Trailing characters of previous text used as story context
    #[serde(default = "default_context_window_chars")]
    pub context_window_chars: usize,
}

fn default_lorebook_entry_limit() -> usize {
    5
}

fn default_context_window_chars() -> usize {
    3000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            lorebook_entry_limit: default_lorebook_entry_limit(),
            context_window_chars: default_context_window_chars(),
        }
    }
}

/// A named agent: role, model, system prompt and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent identifier (referenced by pipeline steps)
    pub id: String,

    /// Human-readable agent name
    pub name: String,

    /// Agent role (e.g. "prose_writer", "lore_judge")
    pub role: String,

    /// Model used for generation
    pub model: ModelRef,

    /// System prompt sent ahead of the role-specific message
    #[serde(default)]
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Context-assembly rules
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl AgentConfig {
    /// Create an agent with default sampling settings
    pub fn new(id: impl Into<String>, role: impl Into<String>, model: ModelRef) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            role: role.into(),
            model,
            system_prompt: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            context: ContextConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}
