//! Agent client configuration

/// Configuration for the subprocess agent client
#[derive(Debug, Clone)]
pub struct AgentClientConfig {
    /// Program to run for each generation
    ///
    /// If not provided, defaults to "llm" (assumes it's on PATH).
    pub program: Option<String>,

    /// Program arguments; `{model}`, `{temperature}`, `{max_tokens}` and
    /// `{system}` are substituted per request
    pub args: Vec<String>,

    /// Timeout for one generation in seconds
    pub timeout_secs: u64,
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: vec!["-m".to_string(), "{model}".to_string()],
            timeout_secs: 300,
        }
    }
}

impl AgentClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Program name with the default applied
    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or("llm")
    }
}
