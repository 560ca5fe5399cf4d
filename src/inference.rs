//! Synchronous inference against a finished job's knowledge base.
//!
//! Unlike learning, explain mode runs in the caller's path: the caller waits
//! for the tool and every failure is returned to it directly.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::config::KratorConfig;
use crate::error::{KratorError, Result};
use crate::graph::{self, DecisionGraph, Outcome, Rule};
use crate::jobs::JobStore;
use crate::process::ProcessRunner;

/// Ids of the outcome and rule an explanation was attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredRule {
    pub outcome_id: String,
    pub rule_id: String,
}

/// Tool output plus the knowledge base it was traced against.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub output: String,
    pub graph: DecisionGraph,
    pub fired: Option<FiredRule>,
}

impl Explanation {
    pub fn fired_rule(&self) -> Option<(&Outcome, &Rule)> {
        let fired = self.fired.as_ref()?;
        let outcome = self.graph.outcomes.iter().find(|o| o.id == fired.outcome_id)?;
        let rule = outcome.rules.iter().find(|r| r.id == fired.rule_id)?;
        Some((outcome, rule))
    }
}

pub struct InferenceService<S, R> {
    config: Arc<KratorConfig>,
    store: Arc<S>,
    runner: Arc<R>,
}

impl<S: JobStore, R: ProcessRunner> InferenceService<S, R> {
    pub fn new(config: Arc<KratorConfig>, store: Arc<S>, runner: Arc<R>) -> Self {
        Self {
            config,
            store,
            runner,
        }
    }

    /// Run explain mode for `state` against the knowledge base of `job_id`
    /// and return what the tool printed.
    ///
    /// `state` is a space-separated state vector; absent values are written
    /// as the wildcard `*`.
    pub async fn infer(&self, job_id: &str, state: &str) -> Result<String> {
        if state.trim().is_empty() {
            return Err(KratorError::InvalidState("state must not be empty".into()));
        }
        self.config.resolve_executable()?;
        let knowledge_base = self.knowledge_base(job_id).await?;

        let invocation = self.config.explain_invocation(state, &knowledge_base)?;
        info!(job_id, command = %invocation.display(), "starting inference");

        let out = self.runner.run(&invocation).await.inspect_err(|e| {
            error!(job_id, error = %e, "inference process could not run");
        })?;
        if !out.success() {
            error!(job_id, code = out.exit_code, stderr = %out.stderr.trim(), "inference failed");
            return Err(KratorError::ProcessExecution {
                code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    /// [`infer`](Self::infer), then trace the output back to a rule of the
    /// job's decision graph.
    pub async fn explain(&self, job_id: &str, state: &str) -> Result<Explanation> {
        let output = self.infer(job_id, state).await?;

        let knowledge_base = self.knowledge_base(job_id).await?;
        let text = match tokio::fs::read(&knowledge_base).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KratorError::KnowledgeBaseMissing(job_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let graph = graph::parse(&text);
        let fired = graph::attribute(&graph, &output).map(|hit| FiredRule {
            outcome_id: hit.outcome.id.clone(),
            rule_id: hit.rule.id.clone(),
        });
        Ok(Explanation {
            output,
            graph,
            fired,
        })
    }

    async fn knowledge_base(&self, job_id: &str) -> Result<PathBuf> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| KratorError::JobNotFound(job_id.to_string()))?;
        match job.output_file {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => Ok(path),
            _ => Err(KratorError::KnowledgeBaseMissing(job_id.to_string())),
        }
    }
}
