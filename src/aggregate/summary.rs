//! Job summary, statistics and monthly usage

use crate::error::{ReportError, ReportResult};
use crate::model::{
    short_resource_id, BackupJob, JobStatus, JobSummary, MonthlyUsage, ProtectedResource,
    ReportStatistics, ResourceSelection,
};
use std::collections::BTreeMap;

/// Count jobs per status in a single pass.
///
/// Every bucket is present, zero or not. Fails if the buckets do not add up
/// to the number of jobs ingested.
pub(super) fn tally(jobs: &[BackupJob], ingested: usize) -> ReportResult<JobSummary> {
    let mut counts: BTreeMap<JobStatus, usize> =
        JobStatus::ALL.into_iter().map(|s| (s, 0)).collect();

    for job in jobs {
        *counts.entry(job.status).or_insert(0) += 1;
    }

    let summary = JobSummary {
        counts,
        total: jobs.len(),
    };

    let counted = summary.counted();
    if counted != ingested || summary.total != ingested {
        return Err(ReportError::SummaryMismatch { counted, ingested });
    }

    Ok(summary)
}

fn reports_issue(job: &BackupJob) -> bool {
    job.status == JobStatus::Completed
        && job
            .status_message
            .as_deref()
            .map(|m| m.to_lowercase().contains("issue"))
            .unwrap_or(false)
}

pub(super) fn statistics(
    jobs: &[BackupJob],
    resources: &[ProtectedResource],
    selections: &[ResourceSelection],
    unmatched_rule_count: usize,
) -> ReportStatistics {
    ReportStatistics {
        unique_resource_count: resources.len(),
        total_jobs: jobs.len(),
        total_backup_size_bytes: jobs.iter().filter_map(|j| j.backup_size_bytes).sum(),
        first_backup_at: jobs.iter().filter_map(|j| j.creation_date).min(),
        last_backup_at: jobs.iter().filter_map(|j| j.creation_date).max(),
        completed_with_issues: jobs.iter().filter(|j| reports_issue(j)).count(),
        resources_without_backup: resources.iter().filter(|r| r.last_backup.is_none()).count(),
        orphaned_selection_count: selections.iter().filter(|s| s.orphaned).count(),
        unmatched_rule_count,
    }
}

/// Job count and size per resource per creation month, sorted by ARN then month.
///
/// Jobs without a resource ARN or a creation date have no row to land in.
pub(super) fn monthly_usage(jobs: &[BackupJob]) -> Vec<MonthlyUsage> {
    let mut buckets: BTreeMap<(&str, String), (usize, u64)> = BTreeMap::new();

    for job in jobs {
        let (Some(arn), Some(created)) = (job.resource_arn.as_deref(), job.creation_date) else {
            continue;
        };
        let bucket = buckets
            .entry((arn, created.format("%Y-%m").to_string()))
            .or_default();
        bucket.0 += 1;
        bucket.1 += job.backup_size_bytes.unwrap_or(0);
    }

    buckets
        .into_iter()
        .map(|((arn, month), (job_count, total))| MonthlyUsage {
            resource_arn: arn.to_string(),
            resource_id: short_resource_id(arn).to_string(),
            month,
            job_count,
            total_backup_size_bytes: total,
            average_backup_size_bytes: total / job_count as u64,
        })
        .collect()
}
