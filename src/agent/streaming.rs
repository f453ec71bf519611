//! Token streaming
//!
//! An [`AgentInvoker`](crate::agent::AgentInvoker) hands each generated chunk
//! to a [`TokenSink`] as it arrives. The sink is called synchronously and in
//! order, so a caller that prints tokens sees them exactly as produced.

/// Receiver for tokens produced during generation
///
/// This trait is object-safe and is passed around as `&dyn TokenSink`.
pub trait TokenSink: Send + Sync {
    /// Called once per chunk, in generation order
    fn on_token(&self, token: &str);
}

/// Sink that drops every token
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl TokenSink for NoopSink {
    fn on_token(&self, _token: &str) {}
}

impl<F> TokenSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_token(&self, token: &str) {
        self(token)
    }
}
