use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use ot_core::{has_errors, load_run_config, ConfigError, RunConfig, Validate, ValidationLevel};
use ot_overdue::{list_overdue, run_pipeline, RunError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Emails owners of overdue OneTrust subtasks.
#[derive(Parser, Debug)]
#[command(name = "ot-overdue")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter directive (trace, debug, info, warn, error, or a full EnvFilter)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in, find overdue subtasks and send notifications
    Run {
        #[command(flatten)]
        target: TargetArgs,
        /// Print messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Log in and print overdue subtasks as JSON without notifying anyone
    List {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Load and validate the configuration file
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Path to the run configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,
    /// Only subtasks due before this RFC 3339 instant; defaults to now
    #[arg(long, value_parser = parse_cutoff)]
    cutoff: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("failed to load config at {path}: {source}")]
    LoadConfig {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
    #[error("config at {path} has {count} error(s)")]
    InvalidConfig { path: PathBuf, count: usize },
    #[error("failed to serialize overdue tasks as json: {source}")]
    SerializeTasks {
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Run(#[from] RunError),
}

fn parse_cutoff(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(err) = dispatch(cli.command) {
        eprintln!("ot-overdue failed: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn dispatch(command: Command) -> Result<(), MainError> {
    match command {
        Command::Run { target, dry_run } => {
            let config = load_valid_config(&target.config)?;
            let cutoff = target.cutoff.unwrap_or_else(Utc::now);
            let summary = run_pipeline(&config, cutoff, dry_run)?;
            println!(
                "processed {} overdue task(s): {} sent, {} failed{}",
                summary.processed,
                summary.sent,
                summary.failed,
                if summary.truncated {
                    " (more tasks exist beyond the first page)"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Command::List { target } => {
            let config = load_valid_config(&target.config)?;
            let cutoff = target.cutoff.unwrap_or_else(Utc::now);
            let batch = list_overdue(&config, cutoff)?;
            let rendered = serde_json::to_string_pretty(&batch)
                .map_err(|source| MainError::SerializeTasks { source })?;
            println!("{rendered}");
            Ok(())
        }
        Command::CheckConfig { config } => {
            load_valid_config(&config)?;
            println!("config ok: {}", config.display());
            Ok(())
        }
    }
}

/// Loads the config and logs every validation issue. Warnings pass;
/// errors fail.
fn load_valid_config(path: &Path) -> Result<RunConfig, MainError> {
    let config = load_run_config(path).map_err(|source| MainError::LoadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let issues = config.validate();
    for issue in &issues {
        match issue.level {
            ValidationLevel::Error => {
                tracing::error!(code = issue.code, "{}", issue.message)
            }
            ValidationLevel::Warning => {
                tracing::warn!(code = issue.code, "{}", issue.message)
            }
        }
    }
    if has_errors(&issues) {
        let count = issues
            .iter()
            .filter(|issue| issue.level == ValidationLevel::Error)
            .count();
        return Err(MainError::InvalidConfig {
            path: path.to_path_buf(),
            count,
        });
    }
    Ok(config)
}
