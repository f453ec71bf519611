//! CLI output formatting

use crate::core::{ExecutionStatus, StepResult};
use crate::persistence::RunSummary;
use crate::presets::PipelinePreset;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static LOOP: Emoji<'_, '_> = Emoji("🔁 ", "<- ");

/// Create a spinner for a step that is generating
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Ready => style("READY").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Aborted => style("ABORTED").yellow().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a step result as a one-line report
pub fn format_step_result(result: &StepResult) -> String {
    let label = if result.is_revision {
        format!("{} (revision {})", result.agent_name, result.iteration)
    } else {
        result.agent_name.clone()
    };

    if result.success {
        format!(
            "{} {} {}",
            CHECK,
            style(label).green(),
            style(format!(
                "({} words, {})",
                result.output.split_whitespace().count(),
                format_duration(result.duration().to_std().unwrap_or_default())
            ))
            .dim()
        )
    } else {
        format!(
            "{} {}: {}",
            CROSS,
            style(label).red(),
            style(result.error.as_deref().unwrap_or("failed")).dim()
        )
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Aborted => WARN,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Ready => INFO,
    };

    format!(
        "{} {} - {} - {} - {} steps ({} failed, {} revisions), {} words - {}",
        status_icon,
        style(&summary.execution_id.to_string()[..8]).dim(),
        style(&summary.pipeline_name).bold(),
        format_status(summary.status),
        summary.steps_run,
        summary.failed_steps,
        summary.revisions,
        style(summary.prose_words).cyan(),
        style(format_duration(summary.duration().to_std().unwrap_or_default())).dim()
    )
}

/// Format a pipeline preset with its steps
pub fn format_preset(preset: &PipelinePreset) -> String {
    let mut lines = vec![format!(
        "{} {}\n    {}",
        ROCKET,
        style(&preset.name).bold(),
        style(&preset.description).dim()
    )];
    for step in &preset.steps {
        let mut line = format!("    {}. {}", step.order + 1, style(&step.agent_config_id).cyan());
        if let Some(condition) = &step.condition {
            line.push_str(&format!(" {}", style(format!("if {}", condition)).yellow()));
        }
        if step.is_revision {
            line.push_str(&format!(" {}", style("[revision]").magenta()));
        }
        if step.stream_output {
            line.push_str(&format!(" {}", style("[streams]").dim()));
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Horizontal rule spanning the terminal width
pub fn separator() -> String {
    // Get terminal width, default to 80 if unavailable
    let width = term_size::dimensions_stdout().map(|(w, _)| w).unwrap_or(80);
    "─".repeat(width)
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
