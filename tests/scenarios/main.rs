//! Scenario tests for prose-pipeline runs

#[path = "../helpers.rs"]
mod helpers;

mod abort;
mod conditions;
mod fail_soft;
mod presets;
mod revision_loop;
mod streaming;
