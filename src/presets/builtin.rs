//! Built-in system agents and pipelines

use crate::core::{roles, AgentConfig, ModelRef, PipelineStep};
use crate::presets::{AgentPreset, PipelinePreset};

/// Id of the system agent for a role
pub fn system_agent_id(role: &str) -> String {
    format!("system:{}", role)
}

fn utility_model() -> ModelRef {
    ModelRef {
        id: "z-ai/glm-4-flash".to_string(),
        provider: "openrouter".to_string(),
        name: Some("Z.AI: GLM-4 Flash".to_string()),
    }
}

fn creative_model() -> ModelRef {
    ModelRef {
        id: "deepseek/deepseek-chat-v3-0324".to_string(),
        provider: "openrouter".to_string(),
        name: Some("DeepSeek: DeepSeek V3 0324".to_string()),
    }
}

fn system_agent(
    role: &str,
    name: &str,
    description: &str,
    model: ModelRef,
    temperature: f32,
    max_tokens: u32,
    system_prompt: &str,
) -> AgentPreset {
    let mut agent = AgentConfig::new(system_agent_id(role), role, model)
        .with_name(name)
        .with_system_prompt(system_prompt);
    agent.temperature = temperature;
    agent.max_tokens = max_tokens;
    AgentPreset {
        agent,
        description: description.to_string(),
        is_system: true,
    }
}

/// The six system agents
pub fn system_agents() -> Vec<AgentPreset> {
    vec![
        system_agent(
            roles::SUMMARIZER,
            "System Summarizer",
            "Condenses story content while preserving key narrative details. Uses low-cost model.",
            utility_model(),
            0.3,
            2000,
            "You are a narrative summarizer for fiction writing. Your job is to condense story \
             content while preserving:\n\
             - Key plot points and events in chronological order\n\
             - Character emotions, motivations, and relationships\n\
             - Important dialogue and its context\n\
             - Setting details and atmosphere\n\
             - Foreshadowing, subtext, and thematic elements\n\n\
             Output a concise but detailed summary that captures the essence of the narrative. \
             Aim for about 20% of the original length while keeping all critical story beats.",
        ),
        system_agent(
            roles::PROSE_WRITER,
            "System Prose Writer",
            "Main creative writing agent for generating story prose.",
            creative_model(),
            0.85,
            2048,
            "You are a skilled fiction writer. Your task is to continue the story based on the \
             provided context and scene beat instructions.\n\n\
             Guidelines:\n\
             - Maintain consistent tone, style, and narrative voice\n\
             - Show, don't tell - use sensory details and action\n\
             - Keep characters' voices distinct and authentic\n\
             - Balance dialogue, action, and internal reflection\n\
             - Create smooth transitions and natural pacing\n\
             - Honor the established world-building and lore\n\n\
             Write engaging prose that draws readers in and advances the story naturally.",
        ),
        system_agent(
            roles::LORE_JUDGE,
            "System Lore Judge",
            "Validates generated prose against lorebook data for consistency.",
            utility_model(),
            0.2,
            800,
            "You are a lore consistency checker for fiction writing. Compare the provided prose \
             against the established lorebook data.\n\n\
             Check for:\n\
             - Character names, traits, and behavior consistency\n\
             - Location and setting accuracy\n\
             - Timeline and chronological consistency\n\
             - Magic system, technology, or world-building rule violations\n\
             - Relationship dynamics matching established patterns\n\
             - Factual contradictions with established lore\n\n\
             Response format:\n\
             - If everything is consistent, respond with exactly: CONSISTENT\n\
             - If there are issues, list each one briefly:\n  \
             ISSUE: [Brief description of the inconsistency]\n  \
             SUGGESTION: [How to fix it]\n\n\
             Be thorough but concise. Focus on actual contradictions, not stylistic preferences.",
        ),
        system_agent(
            roles::CONTINUITY_CHECKER,
            "System Continuity Checker",
            "Checks for plot holes and character consistency.",
            utility_model(),
            0.2,
            600,
            "You are a continuity expert for fiction writing. Check for plot holes, timeline \
             issues, and character consistency.\n\n\
             Review for:\n\
             - Timeline inconsistencies (events happening out of order)\n\
             - Character behavior that contradicts established patterns\n\
             - Forgotten plot threads or unresolved setups\n\
             - Physical impossibilities (character in two places at once)\n\
             - Emotional continuity (reactions matching previous scenes)\n\n\
             Response format:\n\
             - If consistent, respond with exactly: CONSISTENT\n\
             - If there are issues:\n  \
             CONTINUITY ISSUE: [Description]\n  \
             CONTEXT: [What was established earlier]\n  \
             SUGGESTION: [How to resolve]\n\n\
             Focus on narrative logic, not style preferences.",
        ),
        system_agent(
            roles::STYLE_EDITOR,
            "System Style Editor",
            "Polishes prose for style, flow, and readability.",
            creative_model(),
            0.6,
            2048,
            "You are a prose editor focused on style and flow. Polish the provided text while \
             maintaining the author's voice.\n\n\
             Focus on:\n\
             - Sentence variety and rhythm\n\
             - Word choice precision and impact\n\
             - Paragraph flow and transitions\n\
             - Show vs tell balance\n\
             - Eliminating redundancy and weak phrases\n\
             - Strengthening imagery and sensory details\n\n\
             Preserve the original meaning, plot, and character voice. Output the improved \
             version directly without commentary.",
        ),
        system_agent(
            roles::DIALOGUE_SPECIALIST,
            "System Dialogue Specialist",
            "Improves dialogue authenticity and character voice.",
            creative_model(),
            0.7,
            2048,
            "You are a dialogue specialist for fiction. Improve conversations to feel more \
             natural and authentic.\n\n\
             Focus on:\n\
             - Giving each character a distinct voice and speech pattern\n\
             - Natural interruptions, pauses, and reactions\n\
             - Subtext and what's left unsaid\n\
             - Appropriate use of contractions and informal speech\n\
             - Varying dialogue tags (said, asked, etc.) or eliminating them\n\
             - Balance between dialogue and action beats\n\n\
             Output the improved version directly. Preserve the original plot points and \
             character relationships.",
        ),
    ]
}

/// Step shorthand for built-in pipelines
struct Slot {
    role: &'static str,
    condition: Option<&'static str>,
    stream: bool,
    revision: bool,
}

fn slot(role: &'static str) -> Slot {
    Slot {
        role,
        condition: None,
        stream: false,
        revision: false,
    }
}

impl Slot {
    fn when(mut self, condition: &'static str) -> Self {
        self.condition = Some(condition);
        self
    }

    fn streamed(mut self) -> Self {
        self.stream = true;
        self
    }

    fn revising(mut self) -> Self {
        self.revision = true;
        self
    }
}

fn system_pipeline(name: &str, description: &str, slots: Vec<Slot>) -> PipelinePreset {
    let steps = slots
        .into_iter()
        .enumerate()
        .map(|(order, slot)| {
            let mut step = PipelineStep::new(system_agent_id(slot.role), order as u32);
            step.condition = slot.condition.map(str::to_string);
            step.stream_output = slot.stream;
            step.is_revision = slot.revision;
            step
        })
        .collect();

    PipelinePreset {
        id: format!("system:{}", slug(name)),
        name: name.to_string(),
        description: description.to_string(),
        steps,
        is_system: true,
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// The six system pipelines
pub fn system_pipelines() -> Vec<PipelinePreset> {
    let summarize = || slot(roles::SUMMARIZER).when("wordCount > 3000");

    vec![
        system_pipeline(
            "Quality Prose with Lore Check",
            "Writes prose, validates against lorebook. Streams the prose output.",
            vec![
                summarize(),
                slot(roles::PROSE_WRITER).streamed(),
                slot(roles::LORE_JUDGE),
            ],
        ),
        system_pipeline(
            "Quality Prose with Revision",
            "Writes prose, checks lore, revises if issues found. Best quality for lore-heavy stories.",
            vec![
                summarize(),
                slot(roles::PROSE_WRITER).streamed(),
                slot(roles::LORE_JUDGE),
                slot(roles::PROSE_WRITER)
                    .when("roleOutputContains:lore_judge:ISSUE")
                    .revising()
                    .streamed(),
            ],
        ),
        system_pipeline(
            "Polished Output",
            "Writes prose then polishes for style. Good for final-draft quality.",
            vec![slot(roles::PROSE_WRITER), slot(roles::STYLE_EDITOR).streamed()],
        ),
        system_pipeline(
            "Full Quality Pipeline",
            "Summarize, write, lore check, revise if needed. Maximum quality.",
            vec![
                summarize(),
                slot(roles::PROSE_WRITER).streamed(),
                slot(roles::LORE_JUDGE),
                slot(roles::CONTINUITY_CHECKER),
                slot(roles::PROSE_WRITER)
                    .when("previousOutputContains:ISSUE")
                    .revising()
                    .streamed(),
            ],
        ),
        system_pipeline(
            "Quick Draft",
            "Direct prose generation without validation. Fast but no quality checks.",
            vec![slot(roles::PROSE_WRITER).streamed()],
        ),
        system_pipeline(
            "Dialogue Polish",
            "Writes prose then improves dialogue. Good for dialogue-heavy scenes.",
            vec![
                slot(roles::PROSE_WRITER),
                slot(roles::DIALOGUE_SPECIALIST).streamed(),
            ],
        ),
    ]
}
