//! Command-line interface built on clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// KRATOR: run rule-learning jobs and explain their decisions.
#[derive(Debug, Parser)]
#[command(name = "krator", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file to load instead of `krator.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Learn a knowledge base from an input data file.
    Learn {
        /// Data file handed to the tool.
        input: PathBuf,
    },

    /// List the jobs run against an input file, newest first.
    Results {
        input: PathBuf,
    },

    /// Print the raw knowledge base produced by a job.
    Content {
        job_id: String,
    },

    /// Show a job's knowledge base as a decision graph.
    Graph {
        job_id: String,

        /// Print JSON instead of a tree.
        #[arg(long)]
        json: bool,
    },

    /// Explain a state against a job's knowledge base.
    Infer {
        job_id: String,

        /// Space-separated state vector; use `*` for absent values.
        state: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_learn_subcommand() {
        let cli = Cli::parse_from(["krator", "learn", "data/grid.txt"]);
        match cli.command {
            Command::Learn { input } => assert_eq!(input, PathBuf::from("data/grid.txt")),
            _ => panic!("expected Learn command"),
        }
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "krator",
            "--config",
            "other.toml",
            "--verbose",
            "results",
            "grid.txt",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
        assert!(matches!(cli.command, Command::Results { .. }));
    }

    #[test]
    fn cli_parses_infer_with_wildcards() {
        let cli = Cli::parse_from(["krator", "infer", "abc", "1 * 0", "--json"]);
        match cli.command {
            Command::Infer {
                job_id,
                state,
                json,
            } => {
                assert_eq!(job_id, "abc");
                assert_eq!(state, "1 * 0");
                assert!(json);
            }
            _ => panic!("expected Infer command"),
        }
    }

    #[test]
    fn cli_parses_graph_subcommand() {
        let cli = Cli::parse_from(["krator", "graph", "abc"]);
        assert!(matches!(
            cli.command,
            Command::Graph { ref job_id, json: false } if job_id == "abc"
        ));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
