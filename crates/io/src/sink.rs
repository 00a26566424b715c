// Report sinks configured by [output]

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use legtrack_recon::config::OutputConfig;
use legtrack_recon::RunResult;

use crate::error::IoError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WrittenReports {
    pub csv: Vec<PathBuf>,
    pub xlsx: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl WrittenReports {
    pub fn is_empty(&self) -> bool {
        self.csv.is_empty() && self.xlsx.is_none() && self.json.is_none()
    }
}

/// Relative output paths resolve against `base` (the config file's directory).
fn under(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Write every configured sink for a finished run.
pub fn write_reports(result: &RunResult, output: &OutputConfig, base: &Path) -> Result<WrittenReports, IoError> {
    let mut written = WrittenReports::default();

    if let Some(dir) = &output.dir {
        written.csv = crate::csv::write_views(&result.views, &under(base, dir))?;
    }

    if let Some(xlsx) = &output.xlsx {
        let path = under(base, xlsx);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        crate::xlsx::write_workbook(&result.views, &path)?;
        written.xlsx = Some(path);
    }

    if let Some(json) = &output.json {
        let path = under(base, json);
        crate::json::export(result, &path)?;
        written.json = Some(path);
    }

    info!(
        csv = written.csv.len(),
        xlsx = written.xlsx.is_some(),
        json = written.json.is_some(),
        "reports written"
    );
    Ok(written)
}
