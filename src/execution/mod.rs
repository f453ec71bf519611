//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod revision;
pub mod scheduler;

pub use engine::{AbortHandle, NoopCallbacks, PipelineCallbacks, PipelineExecutor};
pub use executor::{StepOutcome, StepRunner};
pub use revision::{RevisionController, RevisionDecision, RevisionState};
pub use scheduler::StepCursor;
