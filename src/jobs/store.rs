//! Durable job records.
//!
//! [`JobStore`] is the seam the orchestrator writes through. [`JsonJobStore`]
//! either keeps records in memory or writes one JSON file per job into a
//! directory, so several invocations of the binary can share a store without
//! overwriting each other's jobs.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::job::Job;
use crate::error::{KratorError, Result};

/// Storage for [`Job`] records.
///
/// Futures are `Send` so a store can be shared with spawned background units.
pub trait JobStore: Send + Sync {
    /// Persist a freshly created job.
    fn insert(&self, job: &Job) -> impl Future<Output = Result<()>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Job>>> + Send;

    /// Overwrite an existing record. Implementations must reject writes that
    /// regress the status or touch a terminal record.
    fn update(&self, job: &Job) -> impl Future<Output = Result<()>> + Send;

    /// All jobs for one input file, newest first.
    fn list_for_input(&self, input_file: &Path) -> impl Future<Output = Result<Vec<Job>>> + Send;
}

pub struct JsonJobStore {
    backend: Backend,
}

enum Backend {
    Memory(Mutex<Vec<Job>>),
    /// `<root>/<job id>.json`, each replaced atomically on write. The lock
    /// only orders this handle's own read-check-write cycles.
    Dir { root: PathBuf, lock: Mutex<()> },
}

impl JsonJobStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(Vec::new())),
        }
    }

    /// Open a store backed by the directory `root`, created on first insert.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        match tokio::fs::metadata(&root).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(std::io::Error::new(
                    ErrorKind::NotADirectory,
                    format!("job store is not a directory: {}", root.display()),
                )
                .into());
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!(root = %root.display(), "opened job store");
        Ok(Self {
            backend: Backend::Dir {
                root,
                lock: Mutex::new(()),
            },
        })
    }
}

/// Job ids become file names, so only uuid-shaped ids are accepted.
fn record_path(root: &Path, id: &str) -> Option<PathBuf> {
    let plain = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    plain.then(|| root.join(format!("{id}.json")))
}

async fn read_record(path: &Path) -> Result<Option<Job>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write to a sibling temp file, then rename over the record.
async fn write_record(root: &Path, path: &Path, job: &Job) -> Result<()> {
    tokio::fs::create_dir_all(root).await?;
    let tmp = path.with_extension("json.tmp");
    let written = async {
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(job)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
    .await;
    if written.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    written
}

fn check_transition(existing: &Job, job: &Job) -> Result<()> {
    let from = existing.status;
    let legal = if from == job.status {
        !from.is_terminal()
    } else {
        from.can_transition_to(job.status)
    };
    if legal {
        Ok(())
    } else {
        Err(KratorError::InvalidTransition {
            id: job.id.clone(),
            from,
            to: job.status,
        })
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    jobs
}

impl JobStore for JsonJobStore {
    async fn insert(&self, job: &Job) -> Result<()> {
        match &self.backend {
            Backend::Memory(jobs) => {
                jobs.lock().await.push(job.clone());
                Ok(())
            }
            Backend::Dir { root, lock } => {
                let path = record_path(root, &job.id)
                    .ok_or_else(|| KratorError::InvalidJobId(job.id.clone()))?;
                let _guard = lock.lock().await;
                write_record(root, &path, job).await
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Job>> {
        match &self.backend {
            Backend::Memory(jobs) => Ok(jobs.lock().await.iter().find(|j| j.id == id).cloned()),
            Backend::Dir { root, .. } => match record_path(root, id) {
                Some(path) => read_record(&path).await,
                None => Ok(None),
            },
        }
    }

    async fn update(&self, job: &Job) -> Result<()> {
        match &self.backend {
            Backend::Memory(jobs) => {
                let mut jobs = jobs.lock().await;
                let existing = jobs
                    .iter_mut()
                    .find(|j| j.id == job.id)
                    .ok_or_else(|| KratorError::JobNotFound(job.id.clone()))?;
                check_transition(existing, job)?;
                *existing = job.clone();
                Ok(())
            }
            Backend::Dir { root, lock } => {
                let not_found = || KratorError::JobNotFound(job.id.clone());
                let path = record_path(root, &job.id).ok_or_else(not_found)?;
                let _guard = lock.lock().await;
                let existing = read_record(&path).await?.ok_or_else(not_found)?;
                check_transition(&existing, job)?;
                write_record(root, &path, job).await
            }
        }
    }

    async fn list_for_input(&self, input_file: &Path) -> Result<Vec<Job>> {
        let root = match &self.backend {
            Backend::Memory(jobs) => {
                let jobs = jobs.lock().await;
                let matching = jobs.iter().filter(|j| j.input_file == input_file).cloned();
                return Ok(newest_first(matching.collect()));
            }
            Backend::Dir { root, .. } => root,
        };

        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut matching = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match read_record(&path).await {
                Ok(Some(job)) if job.input_file == input_file => matching.push(job),
                Ok(_) => {}
                Err(KratorError::Json(e)) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable job record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(newest_first(matching))
    }
}
