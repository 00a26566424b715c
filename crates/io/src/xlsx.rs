// Excel workbook export, one worksheet per report view

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use tracing::{debug, warn};

use legtrack_recon::views::{Cell, ReportTable};

use crate::error::IoError;

/// Excel caps a worksheet at this many rows.
const MAX_ROWS: usize = 1_048_576;

/// Widest a column gets auto-sized to, in character units.
const MAX_COLUMN_WIDTH: f64 = 60.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkbookStats {
    pub sheets: usize,
    pub rows: usize,
    pub links: usize,
    /// Links Excel refused (usually over-long URLs), written as plain labels.
    pub links_as_text: usize,
}

pub fn write_workbook(tables: &[ReportTable], path: &Path) -> Result<WorkbookStats, IoError> {
    let mut workbook = Workbook::new();
    let mut stats = WorkbookStats::default();
    let header = Format::new().set_bold();

    for table in tables {
        let worksheet = workbook.add_worksheet().set_name(&table.name)?;
        write_sheet(worksheet, table, &header, &mut stats)?;
        stats.sheets += 1;
    }

    if tables.is_empty() {
        // A workbook needs at least one sheet
        workbook.add_worksheet();
    }

    workbook.save(path)?;
    debug!(path = %path.display(), sheets = stats.sheets, rows = stats.rows, "workbook written");
    Ok(stats)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    table: &ReportTable,
    header: &Format,
    stats: &mut WorkbookStats,
) -> Result<(), IoError> {
    let headers = table.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();

    for (col, title) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, header)?;
    }

    let capacity = MAX_ROWS - 1;
    if table.rows.len() > capacity {
        warn!(view = %table.name, rows = table.rows.len(), "view truncated to worksheet capacity");
    }

    for (idx, row) in table.rows.iter().take(capacity).enumerate() {
        let r = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n as f64)?;
                }
                Cell::Link(link) => {
                    stats.links += 1;
                    if worksheet
                        .write_url_with_text(r, c, link.url.as_str(), link.label.as_str())
                        .is_err()
                    {
                        stats.links_as_text += 1;
                        worksheet.write_string(r, c, &link.label)?;
                    }
                }
            }
            if let Some(w) = widths.get_mut(col) {
                *w = (*w).max(cell.display().chars().count());
            }
        }
        stats.rows += 1;
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, (*width as f64 + 2.0).min(MAX_COLUMN_WIDTH))?;
    }

    worksheet.set_freeze_panes(1, 0)?;
    if !headers.is_empty() {
        let last_row = table.rows.len().min(capacity) as u32;
        worksheet.autofilter(0, 0, last_row, (headers.len() - 1) as u16)?;
    }
    Ok(())
}
