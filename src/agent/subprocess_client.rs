//! Subprocess invoker - runs a model CLI and streams its stdout as tokens

use crate::agent::{
    AgentClientConfig, AgentError, AgentInvoker, AgentResponse, GenerationRequest, TokenSink,
    TokenUsage,
};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Invoker that spawns one process per generation
///
/// The rendered prompt is written to the child's stdin and every stdout chunk
/// is forwarded as a token. The child is killed when the generation is
/// cancelled, times out or is dropped.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    config: AgentClientConfig,
}

impl CommandInvoker {
    pub fn new(config: AgentClientConfig) -> Self {
        Self { config }
    }

    /// Get the program path
    pub fn program(&self) -> &str {
        self.config.program()
    }

    /// Arguments with request placeholders substituted
    pub fn render_args(&self, request: &GenerationRequest) -> Vec<String> {
        let system = request.prompt.system_text();
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{model}", &request.model.id)
                    .replace("{temperature}", &request.temperature.to_string())
                    .replace("{max_tokens}", &request.max_tokens.to_string())
                    .replace("{system}", &system)
            })
            .collect()
    }

    /// Text written to stdin; the system prompt is left out when passed as an argument
    fn stdin_payload(&self, request: &GenerationRequest) -> String {
        if self.config.args.iter().any(|a| a.contains("{system}")) {
            request.prompt.user_text()
        } else {
            request.prompt.render()
        }
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        sink: Option<&dyn TokenSink>,
    ) -> Result<AgentResponse, AgentError> {
        let args = self.render_args(request);
        debug!(
            "Spawning {} for agent '{}' (model {})",
            self.program(),
            request.agent_id,
            request.model.id
        );

        let mut child = Command::new(self.program())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::Spawn {
                program: self.program().to_string(),
                source,
            })?;

        // Feed stdin from a task so a chatty child cannot deadlock on a full pipe
        if let Some(mut stdin) = child.stdin.take() {
            let payload = self.stdin_payload(request);
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    debug!("Child closed stdin early: {}", e);
                }
            });
        }

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Internal("child stdout was not captured".to_string()))?;

        let mut decoder = Utf8Chunker::default();
        let mut content = String::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stdout
                .read(&mut buf)
                .await
                .map_err(|e| AgentError::Internal(format!("Failed to read output: {}", e)))?;
            if n == 0 {
                break;
            }
            emit(&decoder.push(&buf[..n]), sink, &mut content);
        }
        emit(&decoder.finish(), sink, &mut content);

        let status = child
            .wait()
            .await
            .map_err(|e| AgentError::Internal(format!("Failed to wait for child: {}", e)))?;

        if !status.success() {
            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => Vec::new(),
            };
            let error = AgentError::Exited {
                program: self.program().to_string(),
                code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            };
            warn!("{}", error);
            return Err(error);
        }

        debug!("{} returned {} bytes of output", self.program(), content.len());
        let usage = TokenUsage::estimate(&self.stdin_payload(request), &content);
        Ok(AgentResponse::new(content).with_usage(usage))
    }
}

fn emit(text: &str, sink: Option<&dyn TokenSink>, content: &mut String) {
    if text.is_empty() {
        return;
    }
    if let Some(sink) = sink {
        sink.on_token(text);
    }
    content.push_str(text);
}

#[async_trait]
impl AgentInvoker for CommandInvoker {
    async fn generate(
        &self,
        request: &GenerationRequest,
        sink: Option<&dyn TokenSink>,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        let secs = self.config.timeout_secs;
        tokio::select! {
            result = timeout(Duration::from_secs(secs), self.run(request, sink)) => {
                result.map_err(|_| AgentError::Timeout(secs))?
            }
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
        }
    }
}

/// Splits a byte stream into UTF-8 text without breaking multi-byte characters
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            Err(e) if e.error_len().is_none() => {
                // Incomplete trailing character: hold it for the next chunk
                let valid = e.valid_up_to();
                let tail = self.pending.split_off(valid);
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending = tail;
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        }
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}
