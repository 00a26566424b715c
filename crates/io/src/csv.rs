// Scraper CSV import and report CSV export

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, warn};

use legtrack_recon::entity::Entity;
use legtrack_recon::model::{parse_timestamp, Snapshot, Timestamp};
use legtrack_recon::views::{file_stem, Cell, Hyperlink, ReportTable};

use crate::error::IoError;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported scraper dumps are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        // More columns breaks ties
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Rows parsed from one scraper CSV.
#[derive(Debug, Clone)]
pub struct CsvBatch<E> {
    pub rows: Vec<Snapshot<E>>,
    /// The file carried explicit `first_seen_at`/`last_seen_at` columns.
    pub has_intervals: bool,
    /// Rows dropped because they did not deserialize or had a bad timestamp.
    pub skipped: usize,
}

impl<E: Clone> CsvBatch<E> {
    /// Records grouped per observation time, oldest cycle first.
    pub fn cycles(&self) -> Vec<(Timestamp, Vec<E>)> {
        let mut grouped: BTreeMap<Timestamp, Vec<E>> = BTreeMap::new();
        for row in &self.rows {
            grouped
                .entry(row.first_seen_at)
                .or_default()
                .push(row.record.clone());
        }
        grouped.into_iter().collect()
    }
}

const SEEN_AT: &str = "seen_at";
const FIRST_SEEN_AT: &str = "first_seen_at";
const LAST_SEEN_AT: &str = "last_seen_at";

/// Parse a scraper CSV whose header names the record's fields.
///
/// Observation time comes from `first_seen_at`/`last_seen_at` columns when both are
/// present, else a `seen_at` column, else `default_seen_at`. Those columns are not
/// passed to the record.
pub fn load_snapshot_csv<E: Entity>(
    content: &str,
    delimiter: u8,
    default_seen_at: Timestamp,
) -> Result<CsvBatch<E>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let first_col = position(FIRST_SEEN_AT);
    let last_col = position(LAST_SEEN_AT);
    let seen_col = position(SEEN_AT);
    let interval = first_col.zip(last_col);

    let meta = [first_col, last_col, seen_col];
    let is_meta = |i: usize| meta.contains(&Some(i));
    let record_headers: StringRecord = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !is_meta(*i))
        .map(|(_, h)| h)
        .collect();

    let mut batch = CsvBatch {
        rows: Vec::new(),
        has_intervals: interval.is_some(),
        skipped: 0,
    };

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header
        let line = idx + 2;
        let raw = result?;
        let fields: StringRecord = raw
            .iter()
            .enumerate()
            .filter(|(i, _)| !is_meta(*i))
            .map(|(_, f)| f)
            .collect();

        let record: E = match fields.deserialize(Some(&record_headers)) {
            Ok(r) => r,
            Err(e) => {
                warn!(kind = %E::KIND, line, error = %e, "skipping malformed row");
                batch.skipped += 1;
                continue;
            }
        };

        let stamp = |col: Option<usize>| -> Option<Option<Timestamp>> {
            match col.and_then(|c| raw.get(c)).map(str::trim) {
                None | Some("") => Some(None),
                Some(text) => parse_timestamp(text).map(Some),
            }
        };

        let row = match (interval, stamp(seen_col)) {
            (Some((f, l)), _) => match (stamp(Some(f)), stamp(Some(l))) {
                (Some(Some(first)), Some(Some(last))) if first <= last => {
                    Some(Snapshot::new(record, first, last))
                }
                _ => None,
            },
            (None, Some(seen)) => Some(Snapshot::observed(record, seen.unwrap_or(default_seen_at))),
            (None, None) => None,
        };

        match row {
            Some(row) => batch.rows.push(row),
            None => {
                warn!(kind = %E::KIND, line, "skipping row with unusable observation time");
                batch.skipped += 1;
            }
        }
    }

    debug!(kind = %E::KIND, rows = batch.rows.len(), skipped = batch.skipped, "csv loaded");
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Spreadsheet formula for a link cell. Embedded quotes are doubled.
pub fn hyperlink_formula(link: &Hyperlink) -> String {
    format!(
        "=HYPERLINK(\"{}\",\"{}\")",
        link.url.replace('"', "\"\""),
        link.label.replace('"', "\"\"")
    )
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Link(link) => hyperlink_formula(link),
        other => other.display(),
    }
}

pub fn write_table<W: Write>(table: &ReportTable, out: W) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(table.headers())?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer.flush()?;
    Ok(())
}

/// Render a view as CSV text.
pub fn render_table(table: &ReportTable) -> Result<String, IoError> {
    let mut buf = Vec::new();
    write_table(table, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn view_file_name(view: &str) -> String {
    format!("{}.csv", file_stem(view))
}

/// Write one CSV per view into `dir`, creating it if needed. A view whose file
/// name is already taken in this call gets a numeric suffix (`house_bills_2.csv`).
pub fn write_views(tables: &[ReportTable], dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(tables.len());
    let mut taken: HashSet<String> = HashSet::new();
    for table in tables {
        let stem = file_stem(&table.name);
        let mut name = format!("{stem}.csv");
        let mut n = 2;
        while !taken.insert(name.clone()) {
            name = format!("{stem}_{n}.csv");
            n += 1;
        }
        if n > 2 {
            warn!(view = %table.name, file = %name, "view file name already taken; renamed");
        }
        let path = dir.join(name);
        let file = std::fs::File::create(&path)?;
        write_table(table, std::io::BufWriter::new(file))?;
        written.push(path);
    }
    Ok(written)
}
