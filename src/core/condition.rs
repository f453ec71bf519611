//! Step run conditions
//!
//! Conditions are a closed vocabulary of string forms. They are parsed once,
//! when a definition is built, into [`Condition`] and evaluated against the
//! run's accumulated results by [`ConditionEvaluator`].

use crate::core::agent::roles;
use crate::core::context::RunContext;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::warn;

/// Comparison operator for word count conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            ">" => Some(Comparison::Greater),
            ">=" => Some(Comparison::GreaterOrEqual),
            "<" => Some(Comparison::Less),
            "<=" => Some(Comparison::LessOrEqual),
            "==" => Some(Comparison::Equal),
            _ => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
        }
    }

    /// Apply the comparison
    pub fn holds(&self, value: usize, threshold: usize) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::Less => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Equal => value == threshold,
        }
    }
}

/// A parsed step condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// No condition: the step always runs
    Always,
    /// `wordCount > N` and friends
    WordCount { op: Comparison, threshold: usize },
    /// `anyJudgeFoundIssues`
    AnyJudgeFoundIssues,
    /// `outputContainsAnyKeyword`, checked against the step's keywords
    OutputContainsAnyKeyword,
    /// `previousOutputContains:X`
    PreviousOutputContains(String),
    /// `previousOutputNotContains:X`
    PreviousOutputNotContains(String),
    /// `roleOutputContains:ROLE:X`
    RoleOutputContains { role: String, needle: String },
    /// `hasLorebookEntries`
    HasLorebookEntries,
    /// `hasPreviousOutput`
    HasPreviousOutput,
    /// Anything else, delegated to a custom hook
    Custom(String),
}

/// A condition string that uses a known form but is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid condition '{expression}': {reason}")]
pub struct ConditionParseError {
    pub expression: String,
    pub reason: String,
}

const PREVIOUS_CONTAINS: &str = "previousoutputcontains:";
const PREVIOUS_NOT_CONTAINS: &str = "previousoutputnotcontains:";
const ROLE_CONTAINS: &str = "roleoutputcontains:";

fn word_count_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^wordcount\s*(>=|<=|==|>|<)\s*(\d+)$").expect("valid word count pattern")
    })
}

impl Condition {
    /// Parse a condition expression; empty or absent means [`Condition::Always`]
    pub fn parse(expression: Option<&str>) -> Result<Self, ConditionParseError> {
        let trimmed = match expression.map(str::trim) {
            None | Some("") => return Ok(Condition::Always),
            Some(s) => s,
        };
        // Prefixes are ASCII, so byte offsets line up with the original text
        let lower = trimmed.to_ascii_lowercase();
        let invalid = |reason: &str| ConditionParseError {
            expression: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if lower.starts_with(PREVIOUS_CONTAINS) {
            let needle = trimmed[PREVIOUS_CONTAINS.len()..].trim();
            if needle.is_empty() {
                return Err(invalid("missing search text"));
            }
            return Ok(Condition::PreviousOutputContains(needle.to_string()));
        }

        if lower.starts_with(PREVIOUS_NOT_CONTAINS) {
            let needle = trimmed[PREVIOUS_NOT_CONTAINS.len()..].trim();
            if needle.is_empty() {
                return Err(invalid("missing search text"));
            }
            return Ok(Condition::PreviousOutputNotContains(needle.to_string()));
        }

        if lower.starts_with(ROLE_CONTAINS) {
            let rest = &trimmed[ROLE_CONTAINS.len()..];
            let (role, needle) = rest
                .split_once(':')
                .map(|(r, n)| (r.trim(), n.trim()))
                .ok_or_else(|| invalid("expected roleOutputContains:ROLE:TEXT"))?;
            if role.is_empty() || needle.is_empty() {
                return Err(invalid("expected roleOutputContains:ROLE:TEXT"));
            }
            return Ok(Condition::RoleOutputContains {
                role: role.to_string(),
                needle: needle.to_string(),
            });
        }

        if lower.starts_with("wordcount") {
            let caps = word_count_pattern()
                .captures(&lower)
                .ok_or_else(|| invalid("expected wordCount <op> <number>"))?;
            let op = Comparison::parse(&caps[1]).ok_or_else(|| invalid("unknown operator"))?;
            let threshold = caps[2]
                .parse()
                .map_err(|_| invalid("threshold out of range"))?;
            return Ok(Condition::WordCount { op, threshold });
        }

        Ok(match lower.as_str() {
            "anyjudgefoundissues" => Condition::AnyJudgeFoundIssues,
            "outputcontainsanykeyword" => Condition::OutputContainsAnyKeyword,
            "haslorebookentries" => Condition::HasLorebookEntries,
            "haspreviousoutput" => Condition::HasPreviousOutput,
            _ => Condition::Custom(trimmed.to_string()),
        })
    }

    /// Check if the step is unconditional
    pub fn is_always(&self) -> bool {
        matches!(self, Condition::Always)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "always"),
            Condition::WordCount { op, threshold } => {
                write!(f, "wordCount {} {}", op.symbol(), threshold)
            }
            Condition::AnyJudgeFoundIssues => write!(f, "anyJudgeFoundIssues"),
            Condition::OutputContainsAnyKeyword => write!(f, "outputContainsAnyKeyword"),
            Condition::PreviousOutputContains(s) => write!(f, "previousOutputContains:{}", s),
            Condition::PreviousOutputNotContains(s) => {
                write!(f, "previousOutputNotContains:{}", s)
            }
            Condition::RoleOutputContains { role, needle } => {
                write!(f, "roleOutputContains:{}:{}", role, needle)
            }
            Condition::HasLorebookEntries => write!(f, "hasLorebookEntries"),
            Condition::HasPreviousOutput => write!(f, "hasPreviousOutput"),
            Condition::Custom(expr) => write!(f, "{}", expr),
        }
    }
}

/// Hook for condition expressions outside the built-in vocabulary
pub trait CustomConditionHook: Send + Sync {
    fn evaluate(&self, expression: &str, ctx: &RunContext) -> bool;
}

impl<F> CustomConditionHook for F
where
    F: Fn(&str, &RunContext) -> bool + Send + Sync,
{
    fn evaluate(&self, expression: &str, ctx: &RunContext) -> bool {
        self(expression, ctx)
    }
}

/// Evaluates parsed conditions against a run context
#[derive(Clone)]
pub struct ConditionEvaluator {
    judge_roles: Vec<String>,
    issue_markers: Vec<String>,
    custom_hook: Option<Arc<dyn CustomConditionHook>>,
}

impl fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("judge_roles", &self.judge_roles)
            .field("issue_markers", &self.issue_markers)
            .field("custom_hook", &self.custom_hook.is_some())
            .finish()
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self {
            judge_roles: roles::DEFAULT_JUDGE_ROLES.iter().map(|r| r.to_string()).collect(),
            issue_markers: vec!["ISSUE".to_string()],
            custom_hook: None,
        }
    }
}

impl ConditionEvaluator {
    pub fn new(judge_roles: Vec<String>, issue_markers: Vec<String>) -> Self {
        Self {
            judge_roles,
            issue_markers,
            custom_hook: None,
        }
    }

    /// Install a hook for custom expressions
    pub fn with_custom_hook(mut self, hook: Arc<dyn CustomConditionHook>) -> Self {
        self.custom_hook = Some(hook);
        self
    }

    /// Check if a role belongs to the judge class
    pub fn is_judge_role(&self, role: &str) -> bool {
        self.judge_roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Evaluate a condition; `keywords` are the step's validation keywords
    pub fn evaluate(&self, condition: &Condition, keywords: &[String], ctx: &RunContext) -> bool {
        let latest_output = ctx.latest().map(|r| r.output.as_str()).unwrap_or("");

        match condition {
            Condition::Always => true,
            Condition::WordCount { op, threshold } => op.holds(ctx.word_count, *threshold),
            Condition::AnyJudgeFoundIssues => ctx.results().iter().any(|r| {
                self.is_judge_role(&r.role)
                    && self.issue_markers.iter().any(|m| r.output.contains(m.as_str()))
            }),
            Condition::OutputContainsAnyKeyword => {
                if keywords.is_empty() {
                    return false;
                }
                let haystack = latest_output.to_lowercase();
                keywords
                    .iter()
                    .filter(|k| !k.is_empty())
                    .any(|k| haystack.contains(&k.to_lowercase()))
            }
            Condition::PreviousOutputContains(needle) => latest_output.contains(needle.as_str()),
            Condition::PreviousOutputNotContains(needle) => {
                !latest_output.contains(needle.as_str())
            }
            Condition::RoleOutputContains { role, needle } => ctx
                .latest_by_role(role)
                .map(|r| r.output.contains(needle.as_str()))
                .unwrap_or(false),
            Condition::HasLorebookEntries => ctx.lorebook_entry_count > 0,
            Condition::HasPreviousOutput => !ctx.results().is_empty(),
            Condition::Custom(expression) => match &self.custom_hook {
                Some(hook) => hook.evaluate(expression, ctx),
                None => {
                    warn!(
                        "No custom condition hook configured for '{}', treating as false",
                        expression
                    );
                    false
                }
            },
        }
    }
}
