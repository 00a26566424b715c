// legtrack CLI - ingest scraper snapshots, reconcile, publish bill reports

mod exit_codes;
mod recon;
mod store;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use legtrack_io::IoError;
use legtrack_recon::model::{parse_timestamp, scrape_timestamp, Timestamp};
use legtrack_recon::ReconError;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "legtrack")]
#[command(about = "Legislative snapshot tracker: temporal reconciliation and bill reports")]
#[command(version)]
struct Cli {
    /// Snapshot store (SQLite). Defaults to [store] path in the config, then the user data dir.
    #[arg(long, global = true, env = "LEGTRACK_STORE")]
    store: Option<PathBuf>,

    /// Log per-row detail (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one scraper CSV into the snapshot store
    #[command(after_help = "\
Examples:
  legtrack ingest bills bills.csv
  legtrack ingest authors authors.csv --at '2025-03-04 06:00'
  legtrack ingest upcoming_meetings upcoming.csv --json

Columns named seen_at, or first_seen_at + last_seen_at, override --at per row.")]
    Ingest {
        /// Entity kind (bills, authors, versions, upcoming_meetings, ...)
        kind: String,

        /// Scraper CSV with a header row naming record fields
        file: PathBuf,

        /// Scrape time for rows without their own (default: now, floored to the minute)
        #[arg(long)]
        at: Option<String>,

        /// Field delimiter (sniffed when omitted)
        #[arg(long)]
        delimiter: Option<char>,

        /// Print the ingest report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Print the current rows of one entity kind as JSON
    #[command(after_help = "\
Examples:
  legtrack current bills
  legtrack current versions --history")]
    Current {
        kind: String,

        /// Print every stored row instead of the resolved current rows
        #[arg(long)]
        history: bool,
    },

    /// Stored row counts per entity kind
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the store and write per-bill reports
    #[command(after_help = "\
Examples:
  legtrack run tracker.toml
  legtrack run tracker.toml --json > run.json
  legtrack run tracker.toml --allow-roster-gaps

Exit 21 when the roster check fails and --allow-roster-gaps is not given;
no report files are written in that case.")]
    Run {
        /// Tracker config (TOML)
        config: PathBuf,

        /// Print the full run result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Also write the full run result as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Publish reports even when bill numbers have gaps or duplicates
        #[arg(long)]
        allow_roster_gaps: bool,

        /// Clock for upcoming-meeting selection (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Check bill-number contiguity per session and chamber prefix
    Roster {
        config: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Validate a tracker config without running
    Validate { config: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store_path = cli.store;
    let result = match cli.command {
        Commands::Ingest { kind, file, at, delimiter, json } => {
            store::cmd_ingest(store_path, kind, file, at, delimiter, json)
        }
        Commands::Current { kind, history } => store::cmd_current(store_path, kind, history),
        Commands::Status { json } => store::cmd_status(store_path, json),
        Commands::Run { config, json, output, allow_roster_gaps, at } => {
            recon::cmd_run(store_path, config, json, output, allow_roster_gaps, at)
        }
        Commands::Roster { config, json } => recon::cmd_roster(store_path, config, json),
        Commands::Validate { config } => recon::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::UnknownEntity(_) => Some("run `legtrack current --help` for the entity kinds".to_string()),
            ReconError::UnknownColumn { .. } => Some("drop_columns takes column ids or headers".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        Self::new(io_exit_code(&err), err.to_string())
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// `--at` value, or the current scrape clock.
fn resolve_clock(at: Option<&str>) -> Result<Timestamp, CliError> {
    match at {
        Some(text) => parse_timestamp(text).ok_or_else(|| {
            CliError::args(format!("invalid --at '{text}'"))
                .with_hint("use 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD HH:MM:SS'")
        }),
        None => Ok(scrape_timestamp(chrono::Local::now())),
    }
}

/// `--store`, else the config's `[store] path` (relative to the config file), else the user data dir.
fn resolve_store_path(flag: Option<PathBuf>, configured: Option<&str>, base: &Path) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = configured {
        let path = Path::new(path);
        return Ok(if path.is_absolute() { path.to_path_buf() } else { base.join(path) });
    }
    dirs::data_dir()
        .map(|dir| dir.join("legtrack").join("snapshots.db"))
        .ok_or_else(|| {
            CliError::args("no snapshot store location").with_hint("pass --store or set LEGTRACK_STORE")
        })
}

fn read_input(path: &Path) -> Result<String, CliError> {
    legtrack_io::csv::read_file_as_utf8(path)
        .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))
}
