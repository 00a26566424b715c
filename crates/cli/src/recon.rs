//! `legtrack run | roster | validate`: config-driven reconciliation and report publishing.

use std::path::{Path, PathBuf};

use legtrack_io::sink::write_reports;
use legtrack_io::SnapshotStore;
use legtrack_recon::assemble::Assembler;
use legtrack_recon::roster::RosterCheck;
use legtrack_recon::{CurrentState, TrackerConfig};

use crate::exit_codes::{EXIT_OUTPUT, EXIT_ROSTER_GAPS};
use crate::{resolve_clock, resolve_store_path, CliError};

struct Loaded {
    config: TrackerConfig,
    base_dir: PathBuf,
}

fn load_config(config_path: &Path) -> Result<Loaded, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::args(format!("cannot read config {}: {e}", config_path.display())))?;
    let config = TrackerConfig::from_toml(&config_str)?;

    // Relative paths in the config resolve against its directory
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok(Loaded { config, base_dir })
}

fn open_store(flag: Option<PathBuf>, loaded: &Loaded) -> Result<SnapshotStore, CliError> {
    let path = resolve_store_path(flag, loaded.config.store.path.as_deref(), &loaded.base_dir)?;
    if !path.exists() {
        return Err(CliError::args(format!("snapshot store not found: {}", path.display()))
            .with_hint("ingest scraper output first with `legtrack ingest`"));
    }
    Ok(SnapshotStore::open(&path)?)
}

fn print_roster(checks: &[RosterCheck]) {
    for c in checks {
        if c.passed() {
            eprintln!(
                "  {} {}: {} bill(s), 1..{} contiguous",
                c.session,
                c.prefix,
                c.bills,
                c.highest.unwrap_or(0)
            );
        } else {
            let gaps: Vec<String> = c.gaps.iter().map(ToString::to_string).collect();
            eprintln!(
                "  {} {}: {} bill(s), {} missing [{}], duplicates {:?}",
                c.session,
                c.prefix,
                c.bills,
                c.missing,
                gaps.join(", "),
                c.duplicates
            );
            if !c.out_of_range.is_empty() {
                eprintln!("    numbers above roster.max_bill_number: {:?}", c.out_of_range);
            }
        }
    }
}

pub fn cmd_run(
    store: Option<PathBuf>,
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    allow_roster_gaps: bool,
    at: Option<String>,
) -> Result<(), CliError> {
    let loaded = load_config(&config_path)?;
    let now = resolve_clock(at.as_deref())?;

    // One read transaction: every kind comes from the same committed state
    let snapshots = open_store(store, &loaded)?.load_all()?;
    let result = legtrack_recon::run(&loaded.config, &snapshots, now)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_OUTPUT, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "'{}': {} bill(s), {} scraped, {} gap-filled, {} disappeared row(s)",
        result.meta.config_name, s.total_bills, s.scraped_bills, s.gap_filled, s.disappeared_rows,
    );
    let statuses: Vec<String> = s.status_counts.iter().map(|(k, v)| format!("{k} {v}")).collect();
    if !statuses.is_empty() {
        eprintln!("status: {}", statuses.join(", "));
    }

    if !result.roster_ok() {
        eprintln!("roster: {} of {} group(s) not contiguous", s.roster_failures, s.roster_checks);
        print_roster(&result.roster);
        if !allow_roster_gaps {
            return Err(CliError::new(EXIT_ROSTER_GAPS, "roster check failed; reports not written")
                .with_hint("fix the scrape or pass --allow-roster-gaps"));
        }
    }

    let written = write_reports(&result, &loaded.config.output, &loaded.base_dir)?;
    for path in &written.csv {
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &written.xlsx {
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &written.json {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

pub fn cmd_roster(store: Option<PathBuf>, config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let loaded = load_config(&config_path)?;
    let snapshots = open_store(store, &loaded)?.load_all()?;

    let state = CurrentState::resolve(&snapshots);
    // The clock only matters for meeting selection, which the roster ignores
    let assembler = Assembler::new(&loaded.config, resolve_clock(None)?)?;
    let checks = assembler.check_roster(&state);

    if json {
        let json_str = serde_json::to_string_pretty(&checks)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_roster(&checks);
    let failures = checks.iter().filter(|c| !c.passed()).count();
    if failures > 0 {
        return Err(CliError::new(
            EXIT_ROSTER_GAPS,
            format!("{failures} roster group(s) not contiguous"),
        ));
    }
    eprintln!("roster ok: {} group(s)", checks.len());
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let loaded = load_config(&config_path)?;
    let config = &loaded.config;
    eprintln!(
        "valid: tracker '{}' with {} view(s), {} meeting-time rule(s)",
        config.name,
        config.effective_views().len(),
        config.meeting_times.len(),
    );
    Ok(())
}
