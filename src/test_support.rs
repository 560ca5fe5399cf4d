//! Fixtures shared by the orchestrator and inference tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::KratorConfig;
use crate::jobs::{Job, JobStore, JsonJobStore};

/// A scratch directory holding a fake tool script and an input file.
pub struct Workspace {
    pub dir: TempDir,
    pub config: KratorConfig,
    pub input: PathBuf,
}

impl Workspace {
    /// `script` is run by `sh` as `tool.sh <mode args..>`, so for learn mode
    /// `$4` is the output path and for explain mode the last argument is the
    /// knowledge base.
    pub fn with_tool(script: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool.sh");
        std::fs::write(&tool, script).unwrap();
        let input = dir.path().join("grid.txt");
        std::fs::write(&input, "x y action\n0 0 rechts\n").unwrap();

        let config = KratorConfig {
            executable: Some(tool),
            launcher: vec!["sh".into()],
            output_dir: dir.path().join("results"),
            store_dir: dir.path().join("jobs"),
            ..Default::default()
        };
        Self { dir, config, input }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> Arc<KratorConfig> {
        Arc::new(self.config.clone())
    }
}

/// Insert a Completed job whose knowledge base is `kb`.
pub async fn completed_job(store: &JsonJobStore, input: &Path, kb: &Path) -> Job {
    let mut job = Job::new(input);
    job.start().unwrap();
    job.complete(kb).unwrap();
    store.insert(&job).await.unwrap();
    job
}
