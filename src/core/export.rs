// src/core/export.rs

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::core::models::ScanReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name for a report, stamped with the time the scan finished.
pub fn report_file_name(report: &ScanReport) -> String {
    format!(
        "subtocheck-report-{}.json",
        report.finished_at.format("%Y%m%d-%H%M%S")
    )
}

/// Writes `report` as pretty JSON into `directory`, creating it if needed.
pub fn export_report(report: &ScanReport, directory: &Path) -> Result<PathBuf, ExportError> {
    let path = directory.join(report_file_name(report));
    let json = serde_json::to_string_pretty(report)?;

    std::fs::create_dir_all(directory)
        .and_then(|_| std::fs::write(&path, json))
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

    info!(path = %path.display(), issues = report.findings.len(), "Report exported.");
    Ok(path)
}
