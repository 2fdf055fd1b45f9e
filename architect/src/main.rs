//! Backlog-driven requirements-analysis agent CLI.
//!
//! Reads the backlog dataset (`data/jira_data.json` by default), then drives
//! the configured external agent to produce `requirements_analysis.md` under
//! the output directory, streaming agent output to stdout.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use architect::agent::runner::ProcessRunner;
use architect::core::error::LoadError;
use architect::exit_codes;
use architect::io::config::load_config;
use architect::io::init::init_project;
use architect::workflow::{self, WorkflowOutcome, run_workflow, validate_data};

#[derive(Parser)]
#[command(
    name = "architect",
    version,
    about = "Backlog-driven requirements-analysis agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the analysis workflow and stream agent output to stdout.
    Run {
        /// Analysis request handed to the agent.
        #[arg(default_value = workflow::DEFAULT_INPUT)]
        input: String,
    },
    /// Load and validate the backlog data file, printing a summary.
    Validate,
    /// Scaffold `architect.toml`, the sample dataset and the output
    /// directory.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    architect::logging::init();
    let cli = Cli::parse();

    let root = match std::env::current_dir().context("determine working directory") {
        Ok(root) => root,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    };

    let code = match cli.command {
        Command::Run { input } => cmd_run(&root, &input),
        Command::Validate => cmd_validate(&root),
        Command::Init { force } => cmd_init(&root, force),
    };
    std::process::exit(code);
}

fn cmd_run(root: &Path, input: &str) -> i32 {
    match run_analysis(root, input) {
        Ok(outcome) => {
            match &outcome.report_path {
                Some(path) => println!("report written: {}", display_relative(root, path)),
                None => eprintln!("agent finished without writing the report"),
            }
            if let Some(summary) = &outcome.summary {
                println!("summary: {summary}");
            }
            exit_codes::OK
        }
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    }
}

fn run_analysis(root: &Path, input: &str) -> Result<WorkflowOutcome> {
    let config = load_config(&root.join("architect.toml"))?;
    let runner = ProcessRunner::new(config.agent.command.clone());
    let stdout = std::io::stdout();
    let mut sink = stdout.lock();
    run_workflow(root, input, &config, &runner, &mut sink)
}

fn cmd_validate(root: &Path) -> i32 {
    let config = match load_config(&root.join("architect.toml")) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return exit_codes::INVALID;
        }
    };
    match validate_data(root, &config) {
        Ok(summary) => {
            println!(
                "backlog ok: {} epics, {} stories, {} tasks",
                summary.epics, summary.stories, summary.tasks
            );
            exit_codes::OK
        }
        Err(err @ LoadError::NotFound { .. }) => {
            eprintln!("{err}");
            exit_codes::MISSING_DATA
        }
        Err(err) => {
            eprintln!("{err}");
            exit_codes::INVALID
        }
    }
}

fn cmd_init(root: &Path, force: bool) -> i32 {
    match init_project(root, force) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    }
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults_the_input() {
        let cli = Cli::parse_from(["architect", "run"]);
        match cli.command {
            Command::Run { input } => assert_eq!(input, workflow::DEFAULT_INPUT),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_run_accepts_a_custom_request() {
        let cli = Cli::parse_from(["architect", "run", "Focus on the billing epic"]);
        match cli.command {
            Command::Run { input } => assert_eq!(input, "Focus on the billing epic"),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_validate() {
        let cli = Cli::parse_from(["architect", "validate"]);
        assert!(matches!(cli.command, Command::Validate));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["architect", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }
}
