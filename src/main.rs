mod cli;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use krator::{CommandRunner, InferenceService, JobOrchestrator, JsonJobStore, KratorConfig};
use ui::JobProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Arc::new(KratorConfig::load(cli.config.as_deref())?);
    let store = Arc::new(
        JsonJobStore::open(&config.store_dir)
            .await
            .with_context(|| format!("failed to open {}", config.store_dir.display()))?,
    );
    let runner = Arc::new(CommandRunner::with_timeout(config.process_timeout()));

    match cli.command {
        Command::Learn { input } => {
            let orchestrator = JobOrchestrator::new(config, store, runner);
            let id = orchestrator.start_job(&input).await?;
            println!("Started job {id}");

            // The background unit dies with the process, so stay until it is done.
            let job = orchestrator.job(&id).await?;
            let progress = JobProgress::start(&job);
            let waiting = orchestrator.wait(&id);
            tokio::pin!(waiting);
            let job = loop {
                tokio::select! {
                    job = &mut waiting => break job?,
                    _ = tokio::time::sleep(Duration::from_millis(250)) => {
                        progress.update(&orchestrator.job(&id).await?);
                    }
                }
            };
            progress.finish(&job);
        }
        Command::Results { input } => {
            let orchestrator = JobOrchestrator::new(config, store, runner);
            ui::print_jobs(&orchestrator.results(&input).await?);
        }
        Command::Content { job_id } => {
            let orchestrator = JobOrchestrator::new(config, store, runner);
            println!("{}", orchestrator.result_content(&job_id).await?);
        }
        Command::Graph { job_id, json } => {
            let orchestrator = JobOrchestrator::new(config, store, runner);
            let graph = orchestrator.result_graph(&job_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                ui::print_graph(&graph, None);
            }
        }
        Command::Infer {
            job_id,
            state,
            json,
        } => {
            let service = InferenceService::new(config, store, runner);
            let explanation = service.explain(&job_id, &state).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&explanation)?);
            } else {
                println!("{}", explanation.output.trim_end());
                println!();
                ui::print_graph(&explanation.graph, explanation.fired.as_ref());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "krator=debug" } else { "krator=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}
