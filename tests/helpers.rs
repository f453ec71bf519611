//! Test utilities for prose-pipeline: a scripted invoker and recording callbacks

#![allow(dead_code)]

use async_trait::async_trait;
use prose_pipeline::agent::{AgentError, AgentInvoker, AgentResponse, GenerationRequest, TokenSink};
use prose_pipeline::core::{
    AgentConfig, ErrorKind, ModelRef, PipelineDefinition, PipelineStep, StepResult,
};
use prose_pipeline::execution::{AbortHandle, PipelineCallbacks};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// What the mock does for one call
#[derive(Debug, Clone)]
pub enum Reply {
    /// Generate this text
    Text(String),
    /// Fail with an API error
    Error(String),
    /// Abort the run through the registered handle, then wait to be cancelled
    AbortRun,
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub agent_id: String,
    pub role: String,
    pub prompt: String,
    pub streamed: bool,
}

/// Invoker that replies from per-agent scripts
///
/// Agents without a script, or whose script has run out, reply with
/// `"<agent id> output"`. Text is delivered to the sink word by word.
#[derive(Default)]
pub struct ScriptedInvoker {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
    abort: Mutex<Option<AbortHandle>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for an agent
    pub fn script(self, agent_id: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(agent_id.to_string())
            .or_default()
            .extend(replies);
        self
    }

    /// Handle used by [`Reply::AbortRun`]
    pub fn set_abort_handle(&self, handle: AbortHandle) {
        *self.abort.lock().unwrap() = Some(handle);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Agent ids in call order
    pub fn call_order(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.agent_id).collect()
    }

    fn next_reply(&self, agent_id: &str) -> Reply {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(agent_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::Text(format!("{} output", agent_id)))
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn generate(
        &self,
        request: &GenerationRequest,
        sink: Option<&dyn TokenSink>,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        self.calls.lock().unwrap().push(Call {
            agent_id: request.agent_id.clone(),
            role: request.role.clone(),
            prompt: request.prompt.render(),
            streamed: sink.is_some(),
        });

        match self.next_reply(&request.agent_id) {
            Reply::Text(output) => {
                if let Some(sink) = sink {
                    for token in output.split_inclusive(' ') {
                        tokio::task::yield_now().await;
                        sink.on_token(token);
                    }
                }
                Ok(AgentResponse::new(output))
            }
            Reply::Error(message) => Err(AgentError::Api(message)),
            Reply::AbortRun => {
                let handle = self.abort.lock().unwrap().clone();
                if let Some(handle) = handle {
                    handle.abort();
                }
                cancel.cancelled().await;
                Err(AgentError::Cancelled)
            }
        }
    }
}

/// A lifecycle notification
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start(usize),
    Token(String),
    Complete { index: usize, success: bool },
    Skipped(usize),
    Failed(usize),
    Revision { from: usize, to: usize, iteration: u32 },
}

/// Callbacks that record every notification in order
#[derive(Default)]
pub struct RecordingCallbacks {
    events: Mutex<Vec<Event>>,
}

impl RecordingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// All streamed tokens joined together
    pub fn streamed_text(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Token(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Skipped(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl PipelineCallbacks for RecordingCallbacks {
    fn on_step_start(&self, index: usize, _agent_name: &str) {
        self.push(Event::Start(index));
    }

    fn on_step_complete(&self, result: &StepResult, index: usize) {
        self.push(Event::Complete {
            index,
            success: result.success,
        });
    }

    fn on_token(&self, token: &str) {
        self.push(Event::Token(token.to_string()));
    }

    fn on_step_skipped(&self, index: usize, _reason: &str) {
        self.push(Event::Skipped(index));
    }

    fn on_step_failed(&self, index: usize, _error: &ErrorKind) {
        self.push(Event::Failed(index));
    }

    fn on_revision(&self, from: usize, to: usize, iteration: u32) {
        self.push(Event::Revision { from, to, iteration });
    }
}

/// Agent with a mock model
pub fn agent(id: &str, role: &str) -> AgentConfig {
    AgentConfig::new(id, role, ModelRef::new("mock", "mock-model")).with_name(id.to_uppercase())
}

/// Definition over agents `writer` (prose_writer), `judge` (lore_judge),
/// `summarizer`, `editor` (style_editor) and `critic` (a custom role)
pub fn definition(steps: Vec<PipelineStep>) -> PipelineDefinition {
    PipelineDefinition::build(
        "test pipeline",
        steps,
        vec![
            agent("writer", "prose_writer"),
            agent("judge", "lore_judge"),
            agent("summarizer", "summarizer"),
            agent("editor", "style_editor"),
            agent("critic", "critic"),
        ],
    )
    .unwrap()
}
