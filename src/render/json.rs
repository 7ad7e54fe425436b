//! JSON report renderer

use crate::error::ReportResult;
use crate::model::BackupReport;

/// Serialize the report with stable camelCase keys and RFC 3339 timestamps
pub fn to_json_string(report: &BackupReport) -> ReportResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Pretty-printed report file contents, newline terminated
pub fn render_json(report: &BackupReport) -> ReportResult<Vec<u8>> {
    let mut content = to_json_string(report)?;
    content.push('\n');
    Ok(content.into_bytes())
}
