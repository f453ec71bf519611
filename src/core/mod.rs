//! Core domain models
//!
//! This module defines the data structures that describe pipelines, the
//! agents their steps run, and the state accumulated by one run.

pub mod agent;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod step;

pub use agent::*;
pub use condition::{Comparison, Condition, ConditionEvaluator, ConditionParseError, CustomConditionHook};
pub use config::{EngineSettings, PipelineConfig};
pub use context::*;
pub use error::DefinitionError;
pub use pipeline::*;
pub use state::*;
pub use step::*;
