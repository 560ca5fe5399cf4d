//! Background rule-learning jobs and decision-graph explanations.
//!
//! [`JobOrchestrator`] launches the external tool in learn mode without
//! blocking its caller and records each job's lifecycle in a [`JobStore`].
//! [`graph::parse`] turns a finished job's knowledge base into a
//! [`DecisionGraph`], and [`InferenceService`] runs explain mode and traces
//! the answer back to the rule that fired.

pub mod config;
pub mod error;
pub mod graph;
pub mod inference;
pub mod jobs;
pub mod orchestrator;
pub mod process;
#[cfg(test)]
mod test_support;

pub use config::KratorConfig;
pub use error::{KratorError, Result};
pub use graph::DecisionGraph;
pub use inference::{Explanation, FiredRule, InferenceService};
pub use jobs::{Job, JobStatus, JobStore, JsonJobStore};
pub use orchestrator::{JobOrchestrator, RESULT_FILE_MISSING};
pub use process::{CommandRunner, Invocation, ProcessError, ProcessOutput, ProcessRunner};
