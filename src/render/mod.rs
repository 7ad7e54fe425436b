//! Report renderers
//!
//! Both renderers are pure projections of a [`BackupReport`] into bytes;
//! [`write_atomic`] is the only place that touches the filesystem.

pub mod json;
pub mod spreadsheet;

pub use json::{render_json, to_json_string};
pub use spreadsheet::{project, render_workbook, Cell, Sheet, MAX_CELL_CHARS};

use crate::error::{ReportError, ReportResult};
use crate::model::BackupReport;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn temp_path_for(path: &Path) -> PathBuf {
    let extension = path
        .extension()
        .map(|ext| format!("{}.tmp", ext.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    path.with_extension(extension)
}

/// Write bytes to a file atomically (write to temp, then rename)
///
/// The temp file sits next to the target so the rename stays on one
/// filesystem. On any failure the temp file is removed and the target is
/// left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> ReportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ReportError::Output(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path);

    let result = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.flush()?;
            // Sync to disk before rename
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    result.map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ReportError::Output(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Write the JSON report and the workbook as a pair.
///
/// Both documents are rendered before either file is written. If the workbook
/// cannot be written the JSON file is removed again, so a run leaves both
/// files or neither.
pub fn write_reports(report: &BackupReport, json_path: &Path, xlsx_path: &Path) -> ReportResult<()> {
    let json = render_json(report)?;
    let workbook = render_workbook(report)?;

    write_atomic(json_path, &json)?;
    if let Err(e) = write_atomic(xlsx_path, &workbook) {
        if let Err(cleanup) = fs::remove_file(json_path) {
            tracing::warn!("Failed to remove {}: {}", json_path.display(), cleanup);
        }
        return Err(e);
    }

    tracing::info!("Wrote {} and {}", json_path.display(), xlsx_path.display());
    Ok(())
}
