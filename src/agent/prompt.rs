//! Prompt resolution
//!
//! A [`PromptResolver`] turns an agent, the run so far and the caller's input
//! into the messages sent to the model. [`RolePromptResolver`] builds a
//! role-specific user message for each of the well-known roles.

use crate::core::agent::{roles, AgentConfig};
use crate::core::context::{LorebookEntry, PipelineInput, RunContext};
use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single prompt message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Messages ready to send to a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrompt {
    pub messages: Vec<PromptMessage>,
}

impl ResolvedPrompt {
    /// Prompt with a system message (skipped when empty) and a user message
    pub fn new(system: &str, user: impl Into<String>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(PromptMessage {
                role: MessageRole::System,
                content: system.to_string(),
            });
        }
        messages.push(PromptMessage {
            role: MessageRole::User,
            content: user.into(),
        });
        Self { messages }
    }

    /// Concatenated system messages
    pub fn system_text(&self) -> String {
        self.join(MessageRole::System)
    }

    /// Concatenated user messages
    pub fn user_text(&self) -> String {
        self.join(MessageRole::User)
    }

    /// Flatten every message into one plain-text prompt
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn join(&self, role: MessageRole) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == role)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Builds the prompt for one step
pub trait PromptResolver: Send + Sync {
    /// `instruction` is set when the step runs as a revision
    fn resolve(
        &self,
        agent: &AgentConfig,
        ctx: &RunContext,
        input: &PipelineInput,
        instruction: Option<&str>,
    ) -> ResolvedPrompt;
}

/// Default resolver with one message template per role
#[derive(Debug, Clone, Default)]
pub struct RolePromptResolver;

const LORE_DESCRIPTION_CHARS: usize = 200;
const CONTINUITY_CONTEXT_CHARS: usize = 2000;

impl PromptResolver for RolePromptResolver {
    fn resolve(
        &self,
        agent: &AgentConfig,
        ctx: &RunContext,
        input: &PipelineInput,
        instruction: Option<&str>,
    ) -> ResolvedPrompt {
        let user = match instruction {
            Some(instruction) => instruction.to_string(),
            None => user_message(agent, ctx, input),
        };
        ResolvedPrompt::new(&agent.system_prompt, user)
    }
}

fn user_message(agent: &AgentConfig, ctx: &RunContext, input: &PipelineInput) -> String {
    match agent.role.to_ascii_lowercase().as_str() {
        roles::SUMMARIZER => summarizer_message(input),
        roles::PROSE_WRITER => prose_writer_message(agent, ctx, input),
        roles::LORE_JUDGE => lore_judge_message(ctx, input),
        roles::CONTINUITY_CHECKER => continuity_message(ctx, input),
        roles::STYLE_EDITOR => style_editor_message(ctx),
        roles::DIALOGUE_SPECIALIST => dialogue_message(ctx),
        roles::EXPANDER => expander_message(input),
        _ => generic_message(ctx, input),
    }
}

fn output_of(ctx: &RunContext, role: &str) -> String {
    ctx.latest_by_role(role)
        .filter(|r| r.success)
        .map(|r| r.output.clone())
        .unwrap_or_default()
}

fn summarizer_message(input: &PipelineInput) -> String {
    format!(
        "Summarize the following text while preserving key narrative details, character \
         emotions, and plot points. Reduce to approximately 1000 words:\n\n{}",
        input.previous_words
    )
}

fn prose_writer_message(agent: &AgentConfig, ctx: &RunContext, input: &PipelineInput) -> String {
    let summary = output_of(ctx, roles::SUMMARIZER);
    let story_context = if summary.is_empty() {
        tail_chars(&input.previous_words, agent.context.context_window_chars).to_string()
    } else {
        summary
    };

    let mut message = String::new();
    let lore = compact_lore(&input.lorebook_entries, agent.context.lorebook_entry_limit);
    if !lore.is_empty() {
        message.push_str(&format!("RELEVANT LORE:\n{}\n\n", lore));
    }
    if let Some(pov) = &input.pov_type {
        message.push_str(&format!("POV: {}", pov));
        if let Some(character) = &input.pov_character {
            message.push_str(&format!(" ({})", character));
        }
        message.push_str("\n\n");
    }
    if let Some(language) = &input.story_language {
        message.push_str(&format!("LANGUAGE: {}\n\n", language));
    }
    message.push_str(&format!("STORY CONTEXT:\n{}\n\n", story_context));
    message.push_str(&format!(
        "---\nSCENE BEAT INSTRUCTION:\n{}\n\nContinue the story:",
        input.scene_beat
    ));
    message
}

fn lore_judge_message(ctx: &RunContext, input: &PipelineInput) -> String {
    let lore = input
        .lorebook_entries
        .iter()
        .map(|e| {
            let category = e.category.as_deref().unwrap_or("entry").to_uppercase();
            format!("[{}] {}:\n{}", category, e.name, e.description)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Check the following prose for consistency with the established lore.\n\n\
         LOREBOOK DATA:\n{}\n\n\
         PROSE TO CHECK:\n{}\n\n\
         List any inconsistencies found, each starting with ISSUE:. \
         If everything is consistent, respond with just: CONSISTENT",
        lore,
        output_of(ctx, roles::PROSE_WRITER)
    )
}

fn continuity_message(ctx: &RunContext, input: &PipelineInput) -> String {
    format!(
        "Check the following new prose for plot and character continuity with the previous \
         context.\n\n\
         PREVIOUS CONTEXT:\n{}\n\n\
         NEW PROSE:\n{}\n\n\
         List any continuity issues (timeline inconsistencies, character behavior changes, \
         forgotten plot points), each starting with ISSUE:. If consistent, respond with: CONSISTENT",
        tail_chars(&input.previous_words, CONTINUITY_CONTEXT_CHARS),
        output_of(ctx, roles::PROSE_WRITER)
    )
}

fn style_editor_message(ctx: &RunContext) -> String {
    format!(
        "Review and polish the following prose for style, flow, and readability. Maintain the \
         author's voice while improving clarity and impact.\n\n\
         PROSE TO EDIT:\n{}\n\n\
         Provide the edited version:",
        output_of(ctx, roles::PROSE_WRITER)
    )
}

fn dialogue_message(ctx: &RunContext) -> String {
    let prose = ctx
        .results()
        .iter()
        .rev()
        .find(|r| {
            r.success
                && (r.role.eq_ignore_ascii_case(roles::PROSE_WRITER)
                    || r.role.eq_ignore_ascii_case(roles::STYLE_EDITOR))
        })
        .map(|r| r.output.as_str())
        .unwrap_or("");

    format!(
        "Review and improve the dialogue in the following prose. Make conversations feel more \
         natural, give each character a distinct voice, and ensure dialogue tags are varied \
         and appropriate.\n\n\
         PROSE:\n{}\n\n\
         Provide the improved version:",
        prose
    )
}

fn expander_message(input: &PipelineInput) -> String {
    format!(
        "Expand the following brief notes/outline into detailed prose:\n\n\
         NOTES:\n{}\n\n\
         Write a fully expanded scene:",
        input.scene_beat
    )
}

fn generic_message(ctx: &RunContext, input: &PipelineInput) -> String {
    let previous = ctx.previous_step_output.as_str();
    if !previous.is_empty() {
        format!("Previous output:\n{}\n\nInstruction: {}", previous, input.scene_beat)
    } else if !input.scene_beat.is_empty() {
        input.scene_beat.clone()
    } else {
        "Process the input as instructed.".to_string()
    }
}

fn compact_lore(entries: &[LorebookEntry], limit: usize) -> String {
    entries
        .iter()
        .take(limit)
        .map(|e| {
            let description = head_chars(&e.description, LORE_DESCRIPTION_CHARS);
            if description.len() < e.description.len() {
                format!("• {}: {}...", e.name, description)
            } else {
                format!("• {}: {}", e.name, description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `n` characters of `text`
fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Last `n` characters of `text`
fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((i, _)) => &text[i..],
        None => "",
    }
}
