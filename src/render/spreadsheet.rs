//! Spreadsheet renderer
//!
//! [`project`] turns a report into plain [`Sheet`] tables; headers are the
//! report's JSON field names (dotted for nested fields). [`render_workbook`]
//! lays those tables out in an xlsx workbook.

use crate::error::ReportResult;
use crate::model::{BackupPlan, BackupReport, BackupRule, JobStatus, TagCondition};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_xlsxwriter::{Format, Workbook};

/// Most characters an xlsx cell can hold
pub const MAX_CELL_CHARS: usize = 32_767;

/// Room kept free for the truncation marker
const MARKER_RESERVE: usize = 80;

/// Shorten text that does not fit in a cell.
///
/// Cuts at the last line break inside the limit when there is one, so list
/// cells lose whole entries, and appends how much was left out.
fn fit_cell_text(value: String) -> String {
    let total = value.chars().count();
    if total <= MAX_CELL_CHARS {
        return value;
    }

    let cut = value
        .char_indices()
        .nth(MAX_CELL_CHARS - MARKER_RESERVE)
        .map_or(value.len(), |(idx, _)| idx);
    let head = &value[..cut];
    let head = match head.rfind('\n') {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head,
    };

    let omitted = total - head.chars().count();
    format!(
        "{}\n[truncated: {} more characters, see the JSON report]",
        head, omitted
    )
}

/// A single spreadsheet cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Self::Text(fit_cell_text(value.into()))
    }

    fn opt_text(value: Option<&str>) -> Self {
        value.map(Self::text).unwrap_or(Self::Empty)
    }

    fn count(value: usize) -> Self {
        Self::Number(value as f64)
    }

    fn bytes(value: u64) -> Self {
        Self::Number(value as f64)
    }

    fn opt_number(value: Option<u64>) -> Self {
        value.map(Self::bytes).unwrap_or(Self::Empty)
    }

    fn time(value: Option<DateTime<Utc>>) -> Self {
        value
            .map(|t| Self::Text(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
            .unwrap_or(Self::Empty)
    }
}

/// A named table with a header row
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: &'static str, headers: &[&'static str]) -> Self {
        Self {
            name,
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }
}

/// Project the report into sheets, in workbook order
pub fn project(report: &BackupReport) -> Vec<Sheet> {
    vec![
        summary_sheet(report),
        resources_sheet(report),
        jobs_sheet(report),
        plans_sheet(report),
        selections_sheet(report),
        monthly_sheet(report),
        diagnostics_sheet(report),
    ]
}

fn summary_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new("Summary", &["field", "value"]);
    let mut row = |field: String, value: Cell| sheet.rows.push(vec![Cell::Text(field), value]);

    row("region".into(), Cell::text(&report.region));
    row("generatedAt".into(), Cell::time(Some(report.generated_at)));
    row(
        "lookbackDays".into(),
        Cell::opt_number(report.lookback_days.map(u64::from)),
    );

    for status in JobStatus::ALL {
        row(
            format!("jobSummary.{}", status.as_str()),
            Cell::count(report.job_summary.count(status)),
        );
    }
    row("jobSummary.total".into(), Cell::count(report.job_summary.total));

    let stats = &report.statistics;
    row(
        "statistics.uniqueResourceCount".into(),
        Cell::count(stats.unique_resource_count),
    );
    row("statistics.totalJobs".into(), Cell::count(stats.total_jobs));
    row(
        "statistics.totalBackupSizeBytes".into(),
        Cell::bytes(stats.total_backup_size_bytes),
    );
    row(
        "statistics.firstBackupAt".into(),
        Cell::time(stats.first_backup_at),
    );
    row(
        "statistics.lastBackupAt".into(),
        Cell::time(stats.last_backup_at),
    );
    row(
        "statistics.completedWithIssues".into(),
        Cell::count(stats.completed_with_issues),
    );
    row(
        "statistics.resourcesWithoutBackup".into(),
        Cell::count(stats.resources_without_backup),
    );
    row(
        "statistics.orphanedSelectionCount".into(),
        Cell::count(stats.orphaned_selection_count),
    );
    row(
        "statistics.unmatchedRuleCount".into(),
        Cell::count(stats.unmatched_rule_count),
    );

    sheet
}

fn resources_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new(
        "Resources",
        &[
            "resourceArn",
            "resourceId",
            "resourceType",
            "lastBackup",
            "lastBackupSource",
            "backupVaultName",
            "backupCount",
            "totalBackupSizeBytes",
            "averageBackupSizeBytes",
        ],
    );

    sheet.rows = report
        .protected_resources
        .iter()
        .map(|r| {
            vec![
                Cell::text(&r.resource_arn),
                Cell::text(&r.resource_id),
                Cell::opt_text(r.resource_type.as_deref()),
                Cell::time(r.last_backup),
                Cell::opt_text(r.last_backup_source.map(|s| s.as_str())),
                Cell::opt_text(r.backup_vault_name.as_deref()),
                Cell::count(r.backup_count),
                Cell::bytes(r.total_backup_size_bytes),
                Cell::opt_number(r.average_backup_size_bytes),
            ]
        })
        .collect();

    sheet
}

fn jobs_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new(
        "Jobs",
        &[
            "id",
            "planId",
            "planName",
            "resourceArn",
            "resourceType",
            "status",
            "rawStatus",
            "statusMessage",
            "creationDate",
            "completionDate",
            "backupSizeBytes",
            "backupVaultName",
            "recoveryPointArn",
        ],
    );

    sheet.rows = report
        .jobs
        .iter()
        .map(|j| {
            vec![
                Cell::opt_text(j.id.as_deref()),
                Cell::opt_text(j.plan_id.as_deref()),
                Cell::opt_text(j.plan_name.as_deref()),
                Cell::opt_text(j.resource_arn.as_deref()),
                Cell::opt_text(j.resource_type.as_deref()),
                Cell::text(j.status.as_str()),
                Cell::opt_text(j.raw_status.as_deref()),
                Cell::opt_text(j.status_message.as_deref()),
                Cell::time(j.creation_date),
                Cell::time(j.completion_date),
                Cell::opt_number(j.backup_size_bytes),
                Cell::opt_text(j.backup_vault_name.as_deref()),
                Cell::opt_text(j.recovery_point_arn.as_deref()),
            ]
        })
        .collect();

    sheet
}

fn plan_row(plan: &BackupPlan, rule: Option<&BackupRule>) -> Vec<Cell> {
    let mut row = vec![
        Cell::text(&plan.id),
        Cell::opt_text(plan.name.as_deref()),
        Cell::opt_text(plan.arn.as_deref()),
        Cell::opt_text(plan.version_id.as_deref()),
        Cell::time(plan.creation_date),
        Cell::time(plan.last_execution_date),
        Cell::count(plan.selection_count),
        Cell::count(plan.selected_resource_count),
    ];

    match rule {
        Some(rule) => row.extend([
            Cell::opt_text(rule.name.as_deref()),
            Cell::opt_text(rule.schedule_expression.as_deref()),
            Cell::opt_text(rule.target_vault.as_deref()),
            Cell::opt_number(rule.start_window_minutes),
            Cell::opt_number(rule.completion_window_minutes),
            Cell::opt_number(rule.lifecycle.move_to_cold_storage_after_days),
            Cell::opt_number(rule.lifecycle.delete_after_days),
            Cell::Bool(rule.enable_continuous_backup),
        ]),
        None => row.extend(std::iter::repeat(Cell::Empty).take(8)),
    }

    row
}

/// One row per plan and rule; a plan without rules still gets a row
fn plans_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new(
        "Plans",
        &[
            "id",
            "name",
            "arn",
            "versionId",
            "creationDate",
            "lastExecutionDate",
            "selectionCount",
            "selectedResourceCount",
            "rules.name",
            "rules.scheduleExpression",
            "rules.targetVault",
            "rules.startWindowMinutes",
            "rules.completionWindowMinutes",
            "rules.lifecycle.moveToColdStorageAfterDays",
            "rules.lifecycle.deleteAfterDays",
            "rules.enableContinuousBackup",
        ],
    );

    for plan in &report.plans {
        if plan.rules.is_empty() {
            sheet.rows.push(plan_row(plan, None));
        }
        for rule in &plan.rules {
            sheet.rows.push(plan_row(plan, Some(rule)));
        }
    }

    sheet
}

fn format_condition(condition: &TagCondition) -> String {
    format!(
        "{} {}={}",
        condition.condition_type,
        condition.key,
        condition.value.as_deref().unwrap_or("")
    )
}

fn selections_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new(
        "Selections",
        &[
            "id",
            "name",
            "planId",
            "planName",
            "orphaned",
            "iamRoleArn",
            "resources",
            "notResources",
            "tagConditions",
        ],
    );

    sheet.rows = report
        .selections
        .iter()
        .map(|s| {
            vec![
                Cell::opt_text(s.id.as_deref()),
                Cell::opt_text(s.name.as_deref()),
                Cell::opt_text(s.plan_id.as_deref()),
                Cell::opt_text(s.plan_name.as_deref()),
                Cell::Bool(s.orphaned),
                Cell::opt_text(s.iam_role_arn.as_deref()),
                Cell::text(s.resources.join("\n")),
                Cell::text(s.not_resources.join("\n")),
                Cell::text(
                    s.tag_conditions
                        .iter()
                        .map(format_condition)
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
            ]
        })
        .collect();

    sheet
}

fn monthly_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new(
        "Monthly",
        &[
            "resourceArn",
            "resourceId",
            "month",
            "jobCount",
            "totalBackupSizeBytes",
            "averageBackupSizeBytes",
        ],
    );

    sheet.rows = report
        .monthly_usage
        .iter()
        .map(|m| {
            vec![
                Cell::text(&m.resource_arn),
                Cell::text(&m.resource_id),
                Cell::text(&m.month),
                Cell::count(m.job_count),
                Cell::bytes(m.total_backup_size_bytes),
                Cell::bytes(m.average_backup_size_bytes),
            ]
        })
        .collect();

    sheet
}

/// Incomplete collections, fetch warnings, coverage gaps and data-quality notes
fn diagnostics_sheet(report: &BackupReport) -> Sheet {
    let mut sheet = Sheet::new("Diagnostics", &["section", "kind", "subject", "detail"]);
    let diagnostics = &report.diagnostics;

    for collection in &diagnostics.incomplete_collections {
        sheet.rows.push(vec![
            Cell::text("incompleteCollections"),
            Cell::text(collection.as_str()),
            Cell::Empty,
            Cell::Empty,
        ]);
    }
    for warning in &diagnostics.fetch_warnings {
        sheet.rows.push(vec![
            Cell::text("fetchWarnings"),
            Cell::text(warning.collection.as_str()),
            Cell::Empty,
            Cell::text(&warning.message),
        ]);
    }
    for gap in &report.coverage_gaps {
        sheet.rows.push(vec![
            Cell::text("coverageGaps"),
            Cell::text(gap.reason.as_str()),
            Cell::text(&gap.resource_arn),
            Cell::opt_text(gap.plan_id.as_deref()),
        ]);
    }
    for note in &diagnostics.notes {
        sheet.rows.push(vec![
            Cell::text("notes"),
            Cell::text(note.kind.as_str()),
            Cell::text(&note.subject),
            Cell::text(&note.detail),
        ]);
    }

    sheet
}

/// Lay the sheets out in a workbook: bold frozen header row, autofit columns
pub fn build_workbook(sheets: &[Sheet]) -> ReportResult<Workbook> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (idx, cells) in sheet.rows.iter().enumerate() {
            let row = idx as u32 + 1;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(text) => {
                        worksheet.write_string(row, col, text)?;
                    }
                    Cell::Number(number) => {
                        worksheet.write_number(row, col, *number)?;
                    }
                    Cell::Bool(flag) => {
                        worksheet.write_boolean(row, col, *flag)?;
                    }
                }
            }
        }

        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();
    }

    Ok(workbook)
}

/// Render the report as xlsx file contents
pub fn render_workbook(report: &BackupReport) -> ReportResult<Vec<u8>> {
    let sheets = project(report);
    let mut workbook = build_workbook(&sheets)?;
    let buffer = workbook.save_to_buffer()?;
    tracing::debug!(
        "Rendered workbook with {} sheets ({} bytes)",
        sheets.len(),
        buffer.len()
    );
    Ok(buffer)
}
