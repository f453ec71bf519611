//! Terminal callbacks for pipeline runs
//!
//! Prints a `[N/M] Agent` header per step. Without `--stream` a spinner runs
//! while the agent generates; with it, tokens of streaming steps are written
//! to stdout as they arrive.

use crate::cli::output::{create_spinner, format_step_result, separator, CROSS, INFO, LOOP};
use crate::core::{ErrorKind, StepResult};
use crate::execution::PipelineCallbacks;
use console::style;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Callbacks that report run progress on the terminal
pub struct TerminalCallbacks {
    stream: bool,
    total_steps: usize,
    spinner: Mutex<Option<ProgressBar>>,
    /// A token was printed since the last step header
    mid_line: AtomicBool,
}

impl TerminalCallbacks {
    pub fn new(stream: bool, total_steps: usize) -> Self {
        Self {
            stream,
            total_steps,
            spinner: Mutex::new(None),
            mid_line: AtomicBool::new(false),
        }
    }

    fn step_header(&self, index: usize, agent_name: &str) -> String {
        format!(
            "[{}/{}] {}",
            style(index + 1).cyan(),
            style(self.total_steps).dim(),
            style(agent_name).bold()
        )
    }

    fn finish_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
        }
    }

    /// End a line of streamed tokens before printing anything else
    fn end_stream_line(&self) {
        if self.mid_line.swap(false, Ordering::SeqCst) {
            println!();
            println!("{}", style(separator()).dim());
        }
    }

    /// Flush stdout to ensure immediate display
    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }
}

impl PipelineCallbacks for TerminalCallbacks {
    fn on_step_start(&self, index: usize, agent_name: &str) {
        self.end_stream_line();
        let header = self.step_header(index, agent_name);
        if self.stream {
            println!("\n{}\n", header);
        } else if let Ok(mut spinner) = self.spinner.lock() {
            *spinner = Some(create_spinner(header));
        }
    }

    fn on_step_complete(&self, result: &StepResult, _index: usize) {
        self.finish_spinner();
        self.end_stream_line();
        println!("{}", format_step_result(result));
    }

    fn on_token(&self, token: &str) {
        if !self.stream {
            return;
        }
        print!("{}", token);
        self.mid_line.store(true, Ordering::SeqCst);
        self.flush_stdout();
    }

    fn on_step_skipped(&self, index: usize, reason: &str) {
        println!(
            "{} {} skipped: {}",
            INFO,
            style(format!("Step {}", index + 1)).dim(),
            style(reason).dim()
        );
    }

    fn on_step_failed(&self, index: usize, error: &ErrorKind) {
        self.finish_spinner();
        self.end_stream_line();
        println!(
            "{} {} {}",
            CROSS,
            style(format!("Step {} failed:", index + 1)).red(),
            style(error).dim()
        );
    }

    fn on_revision(&self, from: usize, to: usize, iteration: u32) {
        println!(
            "{} Revising: step {} returns to step {} (iteration {})",
            LOOP,
            style(from + 1).yellow(),
            style(to + 1).cyan(),
            iteration
        );
    }
}
