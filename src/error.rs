use std::path::PathBuf;

use thiserror::Error;

use crate::jobs::JobStatus;
use crate::process::ProcessError;

#[derive(Debug, Error)]
pub enum KratorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Result file not found on server for job {0}")]
    KnowledgeBaseMissing(String),

    #[error("Invalid job id: {0}")]
    InvalidJobId(String),

    #[error("Invalid inference state: {0}")]
    InvalidState(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Process exited with code {code}. Error: {stderr}")]
    ProcessExecution { code: i32, stderr: String },

    #[error("Background job panicked: {0}")]
    WorkerPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KratorError {
    /// Whether a transport layer should report this as "not found".
    ///
    /// A missing or unconfigured executable lands here too: callers cannot
    /// fix it by retrying with different input.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KratorError::Config(_)
                | KratorError::JobNotFound(_)
                | KratorError::InputNotFound(_)
                | KratorError::KnowledgeBaseMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KratorError>;
