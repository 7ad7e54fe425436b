//! Report model
//!
//! The value object produced by the aggregation engine and consumed by the
//! renderers. Renderers depend only on these shapes; everything here is
//! already derived, so no renderer has to compute anything.

use super::raw::Collection;
use super::status::{JobStatus, LastBackupSource, RecoveryPointStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One region's backup inventory snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub region: String,
    pub generated_at: DateTime<Utc>,
    pub lookback_days: Option<u32>,
    pub plans: Vec<BackupPlan>,
    pub selections: Vec<ResourceSelection>,
    pub jobs: Vec<BackupJob>,
    pub recovery_points: Vec<RecoveryPoint>,
    /// Unique by ARN, sorted by ARN
    pub protected_resources: Vec<ProtectedResource>,
    pub job_summary: JobSummary,
    pub statistics: ReportStatistics,
    pub coverage_gaps: Vec<CoverageGap>,
    pub monthly_usage: Vec<MonthlyUsage>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPlan {
    pub id: String,
    pub name: Option<String>,
    pub arn: Option<String>,
    pub version_id: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_execution_date: Option<DateTime<Utc>>,
    pub rules: Vec<BackupRule>,
    pub selection_count: usize,
    /// Explicit resource ARNs across this plan's selections
    pub selected_resource_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRule {
    pub name: Option<String>,
    pub rule_id: Option<String>,
    pub schedule_expression: Option<String>,
    pub target_vault: Option<String>,
    pub start_window_minutes: Option<u64>,
    pub completion_window_minutes: Option<u64>,
    pub lifecycle: Lifecycle,
    pub enable_continuous_backup: bool,
}

/// Transition and expiration windows, in days
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    pub move_to_cold_storage_after_days: Option<u64>,
    pub delete_after_days: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelection {
    pub id: Option<String>,
    pub name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    /// Plan back-reference did not resolve to a plan in this report
    pub orphaned: bool,
    pub iam_role_arn: Option<String>,
    pub resources: Vec<String>,
    pub not_resources: Vec<String>,
    pub tag_conditions: Vec<TagCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCondition {
    /// e.g. STRINGEQUALS, StringLike
    pub condition_type: String,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupJob {
    /// `null` when the service omitted the job id
    pub id: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub resource_arn: Option<String>,
    pub resource_type: Option<String>,
    pub status: JobStatus,
    /// Original state string, kept only when it was not recognized
    pub raw_status: Option<String>,
    pub status_message: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub backup_size_bytes: Option<u64>,
    pub backup_vault_name: Option<String>,
    pub recovery_point_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPoint {
    pub id: Option<String>,
    pub resource_arn: Option<String>,
    pub resource_type: Option<String>,
    pub backup_vault_name: Option<String>,
    pub status: RecoveryPointStatus,
    pub creation_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResource {
    pub resource_arn: String,
    pub resource_id: String,
    pub resource_type: Option<String>,
    /// Latest terminal-success completion; `None` when there is no such record
    pub last_backup: Option<DateTime<Utc>>,
    pub last_backup_source: Option<LastBackupSource>,
    pub backup_vault_name: Option<String>,
    /// Jobs referencing this resource within the lookback window
    pub backup_count: usize,
    pub total_backup_size_bytes: u64,
    pub average_backup_size_bytes: Option<u64>,
}

/// Job counts per status bucket.
///
/// Serializes flat: one key per status plus `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    #[serde(flatten)]
    pub counts: BTreeMap<JobStatus, usize>,
    pub total: usize,
}

impl JobSummary {
    pub fn count(&self, status: JobStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Sum over every bucket
    pub fn counted(&self) -> usize {
        self.counts.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    pub unique_resource_count: usize,
    pub total_jobs: usize,
    pub total_backup_size_bytes: u64,
    pub first_backup_at: Option<DateTime<Utc>>,
    pub last_backup_at: Option<DateTime<Utc>>,
    /// COMPLETED jobs whose status message reports an issue
    pub completed_with_issues: usize,
    pub resources_without_backup: usize,
    pub orphaned_selection_count: usize,
    pub unmatched_rule_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapReason {
    /// Known resource with no terminal-success backup
    NoSuccessfulBackup,
    /// Named explicitly by a selection, never seen in any job or recovery point
    SelectedButNeverBackedUp,
}

impl GapReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSuccessfulBackup => "NO_SUCCESSFUL_BACKUP",
            Self::SelectedButNeverBackedUp => "SELECTED_BUT_NEVER_BACKED_UP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageGap {
    pub resource_arn: String,
    pub reason: GapReason,
    pub plan_id: Option<String>,
}

/// Per-resource job volume for one calendar month (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    pub resource_arn: String,
    pub resource_id: String,
    /// `YYYY-MM`
    pub month: String,
    pub job_count: usize,
    pub total_backup_size_bytes: u64,
    pub average_backup_size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Collections that were absent or only partially fetched
    pub incomplete_collections: Vec<Collection>,
    pub fetch_warnings: Vec<FetchWarning>,
    pub notes: Vec<DataQualityNote>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.incomplete_collections.is_empty()
            && self.fetch_warnings.is_empty()
            && self.notes.is_empty()
    }

    pub fn notes_of(&self, kind: NoteKind) -> impl Iterator<Item = &DataQualityNote> {
        self.notes.iter().filter(move |n| n.kind == kind)
    }
}

/// A collection that failed to fetch completely
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchWarning {
    pub collection: Collection,
    pub message: String,
}

impl FetchWarning {
    pub fn new(collection: Collection, message: impl Into<String>) -> Self {
        Self {
            collection,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteKind {
    UnmatchedRule,
    OrphanedSelection,
    UnknownJobStatus,
    UnknownRecoveryPointStatus,
    ResourceTypeConflict,
    MissingIdentifier,
    MissingCompletionDate,
    DuplicatePlan,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnmatchedRule => "UNMATCHED_RULE",
            Self::OrphanedSelection => "ORPHANED_SELECTION",
            Self::UnknownJobStatus => "UNKNOWN_JOB_STATUS",
            Self::UnknownRecoveryPointStatus => "UNKNOWN_RECOVERY_POINT_STATUS",
            Self::ResourceTypeConflict => "RESOURCE_TYPE_CONFLICT",
            Self::MissingIdentifier => "MISSING_IDENTIFIER",
            Self::MissingCompletionDate => "MISSING_COMPLETION_DATE",
            Self::DuplicatePlan => "DUPLICATE_PLAN",
        }
    }
}

/// A record that was kept but looked wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityNote {
    pub kind: NoteKind,
    pub subject: String,
    pub detail: String,
}

impl DataQualityNote {
    pub fn new(kind: NoteKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

/// Short resource id from an ARN: the part after the last `/`, or after the
/// last `:` when there is no `/` (e.g. RDS `db:name`).
pub fn short_resource_id(arn: &str) -> &str {
    match arn.rfind('/') {
        Some(idx) => &arn[idx + 1..],
        None => arn.rsplit(':').next().unwrap_or(arn),
    }
}
