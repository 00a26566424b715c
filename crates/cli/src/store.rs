//! `legtrack ingest | current | status`: snapshot store commands.

use std::path::{Path, PathBuf};

use legtrack_io::csv::sniff_delimiter;
use legtrack_io::kinds::{current_json, ingest_csv};
use legtrack_io::SnapshotStore;
use legtrack_recon::EntityKind;

use crate::{read_input, resolve_clock, resolve_store_path, CliError};

fn open_store(flag: Option<PathBuf>) -> Result<SnapshotStore, CliError> {
    let path = resolve_store_path(flag, None, Path::new("."))?;
    SnapshotStore::open(&path).map_err(|e| {
        CliError::from(e).with_hint(format!("store path: {}", path.display()))
    })
}

fn parse_kind(kind: &str) -> Result<EntityKind, CliError> {
    Ok(kind.parse::<EntityKind>()?)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::general(format!("JSON serialization error: {e}")))
}

pub fn cmd_ingest(
    store: Option<PathBuf>,
    kind: String,
    file: PathBuf,
    at: Option<String>,
    delimiter: Option<char>,
    json: bool,
) -> Result<(), CliError> {
    let kind = parse_kind(&kind)?;
    let seen_at = resolve_clock(at.as_deref())?;
    let content = read_input(&file)?;

    let delimiter = match delimiter {
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => return Err(CliError::args(format!("delimiter must be a single ASCII character, got '{c}'"))),
        None => sniff_delimiter(&content),
    };

    let mut store = open_store(store)?;
    let report = ingest_csv(&mut store, kind, &content, delimiter, seen_at)?;

    if json {
        println!("{}", to_json(&report)?);
    }

    if report.imported > 0 {
        eprintln!("{}: imported {} row(s) with recorded intervals", report.kind, report.imported);
    } else {
        eprintln!(
            "{}: {} cycle(s), {} inserted, {} extended, {} removed",
            report.kind, report.cycles, report.inserted, report.extended, report.removed,
        );
    }
    if report.skipped > 0 {
        eprintln!("note: skipped {} malformed row(s)", report.skipped);
    }
    Ok(())
}

pub fn cmd_current(store: Option<PathBuf>, kind: String, history: bool) -> Result<(), CliError> {
    let kind = parse_kind(&kind)?;
    let store = open_store(store)?;
    let rows = current_json(&store, kind, history)?;
    println!("{}", to_json(&rows)?);
    Ok(())
}

pub fn cmd_status(store: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let store = open_store(store)?;
    let counts = store.counts()?;

    if json {
        let map: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(kind, n)| (kind.clone(), serde_json::Value::from(*n)))
            .collect();
        println!("{}", to_json(&map)?);
        return Ok(());
    }

    for kind in EntityKind::ALL {
        let n = counts
            .iter()
            .find(|(name, _)| name == kind.table_name())
            .map_or(0, |(_, n)| *n);
        println!("{:<24} {}", kind.table_name(), n);
    }
    Ok(())
}
