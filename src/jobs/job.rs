use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JobStatus;
use crate::error::{KratorError, Result};

/// One run of the external tool in learn mode against an input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub input_file: PathBuf,
    pub status: JobStatus,
    /// Set only once the job is Completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    /// Set only once the job is Failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            input_file: input_file.into(),
            status: JobStatus::Pending,
            output_file: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending → Running.
    pub fn start(&mut self) -> Result<()> {
        self.advance(JobStatus::Running)
    }

    /// Running → Completed, recording where the knowledge base was written.
    pub fn complete(&mut self, output_file: &Path) -> Result<()> {
        self.advance(JobStatus::Completed)?;
        self.output_file = Some(output_file.to_path_buf());
        Ok(())
    }

    /// Running → Failed with a human-readable reason.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.advance(JobStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }

    fn advance(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(KratorError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
