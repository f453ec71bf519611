//! Generation results and invoker errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a generation produced no usable text
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("API error: {0}")]
    Api(String),

    /// The model command ran but reported failure
    #[error("{program} exited with code {code}: {stderr}")]
    Exited {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Text produced by one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The full generated text
    pub content: String,

    /// Token accounting, when the invoker knows it
    pub usage: Option<TokenUsage>,
}

impl AgentResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Token accounting for one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Rough count for invokers that get no usage report (about 4 chars per token)
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let tokens = |text: &str| text.chars().count().div_ceil(4) as u32;
        let prompt_tokens = tokens(prompt);
        let completion_tokens = tokens(completion);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}
