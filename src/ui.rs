//! Terminal output: a spinner while a job runs, coloured job listings and
//! decision-graph trees.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use krator::{DecisionGraph, FiredRule, Job, JobStatus};

/// Spinner shown while waiting for a background job to finish.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl JobProgress {
    pub fn start(job: &Job) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{}: {}", job.status, job.input_file.display()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    pub fn update(&self, job: &Job) {
        self.pb
            .set_message(format!("{}: {}", job.status, job.input_file.display()));
    }

    /// Clears the spinner and prints the terminal state.
    pub fn finish(&self, job: &Job) {
        self.pb.finish_and_clear();
        match job.status {
            JobStatus::Completed => {
                let output = job
                    .output_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                println!("  {} Job {} completed: {output}", self.green.apply_to("✓"), job.id);
            }
            JobStatus::Failed => {
                let error = job.error.as_deref().unwrap_or("unknown error");
                println!("  {} Job {} failed: {error}", self.red.apply_to("✗"), job.id);
            }
            status => println!("  Job {} is {status}", job.id),
        }
    }
}

pub fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    for job in jobs {
        let style = status_style(job.status);
        let detail = match job.status {
            JobStatus::Completed => job
                .output_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            JobStatus::Failed => job.error.clone().unwrap_or_default(),
            _ => String::new(),
        };
        println!(
            "{}  {}  {}  {detail}",
            job.id,
            style.apply_to(format!("{:<9}", job.status.to_string())),
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
}

/// Outcome → rule → condition tree; the fired rule, if any, is highlighted.
pub fn print_graph(graph: &DecisionGraph, fired: Option<&FiredRule>) {
    if graph.is_empty() {
        println!("No rules found.");
        return;
    }
    let dim = Style::new().dim();
    let bold = Style::new().bold();
    let hit = Style::new().green().bold();

    for outcome in &graph.outcomes {
        let outcome_fired = fired.is_some_and(|f| f.outcome_id == outcome.id);
        let label = if outcome_fired { &hit } else { &bold };
        println!("{}", label.apply_to(&outcome.label));

        for (i, rule) in outcome.rules.iter().enumerate() {
            let last = i + 1 == outcome.rules.len();
            let branch = if last { "└─" } else { "├─" };
            let conditions = if rule.is_base_probability() {
                dim.apply_to("(base probability)").to_string()
            } else {
                rule.condition_labels().join(" ∧ ")
            };
            let line = format!("{branch} [{:.2}] {conditions}", rule.confidence);
            if outcome_fired && fired.is_some_and(|f| f.rule_id == rule.id) {
                println!("{} {}", hit.apply_to(line), hit.apply_to("◀ fired"));
            } else {
                println!("{line}");
            }
        }
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red(),
        JobStatus::Running => Style::new().yellow(),
        JobStatus::Pending => Style::new().dim(),
    }
}
