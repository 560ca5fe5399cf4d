use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore, watch};
use tracing::{debug, error, info, warn};

use crate::config::KratorConfig;
use crate::error::{KratorError, Result};
use crate::graph::{self, DecisionGraph};
use crate::jobs::{Job, JobStatus, JobStore};
use crate::process::ProcessRunner;

/// Returned instead of content when a job's output file is gone.
pub const RESULT_FILE_MISSING: &str = "Result file not found on server.";

/// Starts learning jobs in the background and answers questions about them.
///
/// Each started job gets its own supervised unit of work: the caller gets
/// the id back as soon as the Pending record is stored, and the unit always
/// ends by writing Completed or Failed, whatever happens inside it.
pub struct JobOrchestrator<S, R> {
    worker: Worker<S, R>,
    /// Closes when the job's unit has written its terminal status.
    running: Mutex<HashMap<String, watch::Receiver<()>>>,
}

/// Everything a background unit needs, cheap to clone into a task.
struct Worker<S, R> {
    config: Arc<KratorConfig>,
    store: Arc<S>,
    runner: Arc<R>,
    slots: Option<Arc<Semaphore>>,
}

impl<S, R> Clone for Worker<S, R> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            runner: Arc::clone(&self.runner),
            slots: self.slots.clone(),
        }
    }
}

impl<S, R> JobOrchestrator<S, R>
where
    S: JobStore + 'static,
    R: ProcessRunner + 'static,
{
    pub fn new(config: Arc<KratorConfig>, store: Arc<S>, runner: Arc<R>) -> Self {
        let slots = config
            .max_concurrent_jobs
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        Self {
            worker: Worker {
                config,
                store,
                runner,
                slots,
            },
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a learning job for `input_file` and return its id without
    /// waiting for the tool to run.
    pub async fn start_job(&self, input_file: &Path) -> Result<String> {
        self.worker.config.resolve_executable()?;
        let is_file = tokio::fs::metadata(input_file)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(KratorError::InputNotFound(input_file.to_path_buf()));
        }

        let job = Job::new(input_file);
        self.worker.store.insert(&job).await?;
        info!(job_id = %job.id, input = %input_file.display(), "learning job queued");

        let id = job.id.clone();
        let (done, finished) = watch::channel(());
        let worker = self.worker.clone();
        tokio::spawn(async move {
            let _done = done;
            supervise(worker, job).await;
        });

        let mut running = self.running.lock().await;
        running.retain(|_, rx| rx.has_changed().is_ok());
        running.insert(id.clone(), finished);
        Ok(id)
    }

    /// All jobs for `input_file`, newest first.
    pub async fn results(&self, input_file: &Path) -> Result<Vec<Job>> {
        self.worker.store.list_for_input(input_file).await
    }

    /// Raw knowledge-base text of a job, or [`RESULT_FILE_MISSING`] when the
    /// job has no readable output file.
    pub async fn result_content(&self, job_id: &str) -> Result<String> {
        let job = self.find(job_id).await?;
        let Some(path) = job.output_file else {
            return Ok(RESULT_FILE_MISSING.to_string());
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                warn!(job_id, path = %path.display(), error = %e, "result file unreadable");
                Ok(RESULT_FILE_MISSING.to_string())
            }
        }
    }

    /// [`result_content`](Self::result_content) parsed into a decision graph.
    pub async fn result_graph(&self, job_id: &str) -> Result<DecisionGraph> {
        let content = self.result_content(job_id).await?;
        Ok(graph::parse(&content))
    }

    /// Wait for a job started by this orchestrator to finish and return its
    /// final record. Any number of callers may wait on the same job. Jobs
    /// started elsewhere are returned as currently stored.
    pub async fn wait(&self, job_id: &str) -> Result<Job> {
        let finished = self.running.lock().await.get(job_id).cloned();
        if let Some(mut finished) = finished {
            // Nothing is ever sent: this resolves once the sender is dropped.
            while finished.changed().await.is_ok() {}
        }
        self.find(job_id).await
    }

    /// Current record of a job.
    pub async fn job(&self, job_id: &str) -> Result<Job> {
        self.find(job_id).await
    }

    async fn find(&self, job_id: &str) -> Result<Job> {
        self.worker
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| KratorError::JobNotFound(job_id.to_string()))
    }
}

/// Error boundary around one job. Runs the job as its own task so that a
/// panic inside it surfaces here as a `JoinError` and is recorded as Failed.
async fn supervise<S, R>(worker: Worker<S, R>, job: Job)
where
    S: JobStore + 'static,
    R: ProcessRunner + 'static,
{
    let id = job.id.clone();
    let _permit = match &worker.slots {
        Some(slots) => Arc::clone(slots).acquire_owned().await.ok(),
        None => None,
    };

    let outcome = match tokio::spawn(execute(worker.clone(), job)).await {
        Ok(outcome) => outcome,
        Err(e) => Err(KratorError::WorkerPanicked(e.to_string())),
    };

    if let Err(e) = record_outcome(&worker, &id, outcome).await {
        error!(job_id = %id, error = %e, "failed to record terminal job status");
    }
}

async fn execute<S, R>(worker: Worker<S, R>, mut job: Job) -> Result<PathBuf>
where
    S: JobStore,
    R: ProcessRunner,
{
    job.start()?;
    worker.store.update(&job).await?;
    info!(job_id = %job.id, "job running");

    tokio::fs::create_dir_all(&worker.config.output_dir).await?;
    let output = worker.config.output_dir.join(output_file_name(&job.id));
    let invocation = worker.config.learn_invocation(&job.input_file, &output)?;
    info!(job_id = %job.id, command = %invocation.display(), "starting process");

    let out = worker.runner.run(&invocation).await?;
    if !out.success() {
        return Err(KratorError::ProcessExecution {
            code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    debug!(job_id = %job.id, stdout = %out.stdout.trim(), "process output");
    Ok(output)
}

async fn record_outcome<S: JobStore>(
    worker: &Worker<S, impl ProcessRunner>,
    id: &str,
    outcome: Result<PathBuf>,
) -> Result<()> {
    let mut job = worker
        .store
        .get(id)
        .await?
        .ok_or_else(|| KratorError::JobNotFound(id.to_string()))?;

    // A failure before Running was persisted still has to walk the lifecycle.
    if job.status == JobStatus::Pending {
        job.start()?;
        worker.store.update(&job).await?;
    }

    match outcome {
        Ok(output) => {
            job.complete(&output)?;
            info!(job_id = id, output = %output.display(), "job completed");
        }
        Err(e) => {
            job.fail(e.to_string())?;
            error!(job_id = id, error = %e, "job failed");
        }
    }
    worker.store.update(&job).await
}

/// Unique per job and per run, so concurrent jobs never share a file.
fn output_file_name(job_id: &str) -> String {
    format!("result_{job_id}_{}.txt", Utc::now().timestamp_micros())
}
