//! Configuration loaded from `krator.toml`.
//!
//! Every field has a default, so a missing file is not an error. The
//! `KRATOR_EXECUTABLE` environment variable takes precedence over the file.
//!
//! [`KratorConfig`] also owns the argument grammar of the external tool,
//! because the launcher and learn options that shape it live here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::KratorError;
use crate::process::Invocation;

pub const DEFAULT_CONFIG_FILE: &str = "krator.toml";
pub const EXECUTABLE_ENV: &str = "KRATOR_EXECUTABLE";

#[derive(Debug, Clone, Deserialize)]
pub struct KratorConfig {
    /// Path to the rule-learning tool (a jar or a native binary).
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Program and leading arguments placed before the executable,
    /// e.g. `["java", "-jar"]`. Empty runs the executable directly.
    #[serde(default)]
    pub launcher: Vec<String>,

    /// Options passed right after `-learn`.
    #[serde(default = "default_learn_options")]
    pub learn_options: Vec<String>,

    /// Where knowledge-base files of finished jobs are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory holding one JSON record per job.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// Kill the tool after this many seconds. Unbounded when unset.
    #[serde(default)]
    pub process_timeout_secs: Option<u64>,

    /// Cap on jobs running at once. Uncapped when unset.
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
}

fn default_learn_options() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("krator-jobs")
}

impl Default for KratorConfig {
    fn default() -> Self {
        Self {
            executable: None,
            launcher: Vec::new(),
            learn_options: default_learn_options(),
            output_dir: default_output_dir(),
            store_dir: default_store_dir(),
            process_timeout_secs: None,
            max_concurrent_jobs: None,
        }
    }
}

impl KratorConfig {
    /// Loads `path`, or `krator.toml` in the current directory when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<KratorConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(exe) = std::env::var(EXECUTABLE_ENV)
            && !exe.is_empty()
        {
            config.executable = Some(PathBuf::from(exe));
        }

        Ok(config)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }

    /// The configured executable, provided it exists on disk.
    pub fn resolve_executable(&self) -> Result<&Path, KratorError> {
        let exe = self
            .executable
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| KratorError::Config("executable path is not configured".into()))?;
        if !exe.is_file() {
            return Err(KratorError::Config(format!(
                "executable not found at: {}",
                exe.display()
            )));
        }
        Ok(exe)
    }

    /// `[launcher..] <exe> -learn <options..> <input> <output>`
    pub fn learn_invocation(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<Invocation, KratorError> {
        Ok(self
            .base_invocation()?
            .arg("-learn")
            .args(self.learn_options.iter().cloned())
            .arg(input)
            .arg(output))
    }

    /// `[launcher..] <exe> -infer why <state tokens..> <knowledge base>`
    pub fn explain_invocation(
        &self,
        state: &str,
        knowledge_base: &Path,
    ) -> Result<Invocation, KratorError> {
        Ok(self
            .base_invocation()?
            .args(["-infer", "why"])
            .args(state.split_whitespace())
            .arg(knowledge_base))
    }

    fn base_invocation(&self) -> Result<Invocation, KratorError> {
        let exe = self.resolve_executable()?;
        Ok(match self.launcher.split_first() {
            Some((program, leading)) => Invocation::new(program)
                .args(leading.iter().cloned())
                .arg(exe),
            None => Invocation::new(exe),
        })
    }
}
