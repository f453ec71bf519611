//! Agent invocation: prompt resolution, model calls and token streaming

pub mod client;
pub mod prompt;
pub mod response;
pub mod streaming;
pub mod subprocess_client;

use crate::core::agent::{AgentConfig, ModelRef};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use client::AgentClientConfig;
pub use prompt::{MessageRole, PromptMessage, PromptResolver, ResolvedPrompt, RolePromptResolver};
pub use response::{AgentError, AgentResponse, TokenUsage};
pub use streaming::{NoopSink, TokenSink};
pub use subprocess_client::CommandInvoker;

/// Everything an invoker needs for one generation
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Agent the request is made for
    pub agent_id: String,

    pub role: String,

    pub model: ModelRef,

    pub prompt: ResolvedPrompt,

    pub temperature: f32,

    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Build a request from an agent's model and sampling settings
    pub fn for_agent(agent: &AgentConfig, prompt: ResolvedPrompt) -> Self {
        Self {
            agent_id: agent.id.clone(),
            role: agent.role.clone(),
            model: agent.model.clone(),
            prompt,
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        }
    }
}

/// Trait for model invocation - allows for different implementations
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Generate text for a request
    ///
    /// Every chunk is passed to `sink` (when given) in order before this
    /// returns. Implementations stop promptly once `cancel` fires and return
    /// [`AgentError::Cancelled`].
    async fn generate(
        &self,
        request: &GenerationRequest,
        sink: Option<&dyn TokenSink>,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError>;
}

#[async_trait]
impl<T: AgentInvoker + ?Sized> AgentInvoker for Arc<T> {
    async fn generate(
        &self,
        request: &GenerationRequest,
        sink: Option<&dyn TokenSink>,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        (**self).generate(request, sink, cancel).await
    }
}
