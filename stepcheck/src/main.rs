//! `stepcheck` CLI: check that every step of a suite has an implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use stepcheck::exit_codes;
use stepcheck::logging;
use stepcheck::validate::{ValidateOptions, ValidationStatus, run_validation};

#[derive(Parser)]
#[command(
    name = "stepcheck",
    version,
    about = "Validate specification steps against a language runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the runner whether every step in the selected specs is implemented.
    Validate {
        /// Spec files or directories (default: the configured specs dir).
        specs: Vec<PathBuf>,
        /// Config file (default: `stepcheck.toml`).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Parsed suite document (overrides `suite_path` in config).
        #[arg(long)]
        suite: Option<PathBuf>,
        /// Per-step runner timeout in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Write a JSON report of all errors to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate {
            specs,
            config,
            suite,
            timeout_ms,
            report,
        } => cmd_validate(ValidateOptions {
            specs,
            config_path: config,
            suite_path: suite,
            timeout_ms,
            report_path: report,
        }),
    }
}

fn cmd_validate(options: ValidateOptions) -> Result<i32> {
    let root = std::env::current_dir().context("resolve current directory")?;
    let result = run_validation(&root, &options)?;

    match &result.status {
        ValidationStatus::ParseFailed { errors } => {
            println!("Parse failed with {} error(s).", errors.len());
        }
        ValidationStatus::NoSpecs => println!("No specifications found."),
        ValidationStatus::Passed => println!("No error found."),
        ValidationStatus::Failed => {
            println!(
                "{} step(s) failed validation in {} specification(s).",
                result.err_map.step_errs.len(),
                result.err_map.spec_errs.len()
            );
        }
    }
    Ok(result.status.exit_code())
}
