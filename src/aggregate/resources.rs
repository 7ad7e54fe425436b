//! Protected resource reconciliation
//!
//! Resources come from three feeds: the dedicated protected-resources listing,
//! the jobs feed and the recovery-point feed. They are merged into one entry
//! per ARN. Resource type precedence is dedicated feed, then jobs, then
//! recovery points. The last-backup timestamp only ever comes from job and
//! recovery-point evidence; the dedicated feed's `LastBackupTime` is ignored.

use crate::model::{
    short_resource_id, BackupJob, CoverageGap, DataQualityNote, GapReason, LastBackupSource,
    NoteKind, ProtectedResource, RawProtectedResource, RecoveryPoint, ResourceSelection,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// A terminal-success record that could be a resource's last backup
#[derive(Debug, Clone, PartialEq)]
struct Evidence {
    at: DateTime<Utc>,
    source: LastBackupSource,
    vault: Option<String>,
}

impl Evidence {
    /// Later wins; on equal timestamps the job feed wins
    fn supersedes(&self, current: &Evidence) -> bool {
        match self.at.cmp(&current.at) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => {
                self.source == LastBackupSource::Job
                    && current.source == LastBackupSource::RecoveryPoint
            }
        }
    }
}

#[derive(Debug, Default)]
struct ResourceEntry {
    feed_type: Option<String>,
    job_type: Option<String>,
    point_type: Option<String>,
    evidence: Option<Evidence>,
    backup_count: usize,
    total_size: u64,
}

impl ResourceEntry {
    fn consider(&mut self, candidate: Evidence) {
        let replace = match &self.evidence {
            Some(current) => candidate.supersedes(current),
            None => true,
        };
        if replace {
            self.evidence = Some(candidate);
        }
    }
}

fn first_type(slot: &mut Option<String>, value: Option<&String>) {
    if slot.is_none() {
        *slot = value.filter(|v| !v.is_empty()).cloned();
    }
}

/// Merge all feeds into one resource per ARN, sorted by ARN
pub(super) fn build_resources(
    jobs: &[BackupJob],
    recovery_points: &[RecoveryPoint],
    protected: &[RawProtectedResource],
    notes: &mut Vec<DataQualityNote>,
) -> Vec<ProtectedResource> {
    let mut entries: BTreeMap<&str, ResourceEntry> = BTreeMap::new();

    for raw in protected {
        let Some(arn) = raw.resource_arn.as_deref().filter(|a| !a.is_empty()) else {
            notes.push(DataQualityNote::new(
                NoteKind::MissingIdentifier,
                raw.resource_name.as_deref().unwrap_or("-"),
                "protected resource has no ResourceArn",
            ));
            continue;
        };
        let entry = entries.entry(arn).or_default();
        first_type(&mut entry.feed_type, raw.resource_type.as_ref());
    }

    for job in jobs {
        let Some(arn) = job.resource_arn.as_deref() else {
            continue;
        };
        let entry = entries.entry(arn).or_default();
        first_type(&mut entry.job_type, job.resource_type.as_ref());
        entry.backup_count += 1;
        entry.total_size += job.backup_size_bytes.unwrap_or(0);

        if job.status.is_terminal_success() {
            if let Some(at) = job.completion_date {
                entry.consider(Evidence {
                    at,
                    source: LastBackupSource::Job,
                    vault: job.backup_vault_name.clone(),
                });
            }
        }
    }

    for point in recovery_points {
        let Some(arn) = point.resource_arn.as_deref() else {
            continue;
        };
        let entry = entries.entry(arn).or_default();
        first_type(&mut entry.point_type, point.resource_type.as_ref());

        if point.status.is_terminal_success() {
            if let Some(at) = point.completion_date.or(point.creation_date) {
                entry.consider(Evidence {
                    at,
                    source: LastBackupSource::RecoveryPoint,
                    vault: point.backup_vault_name.clone(),
                });
            }
        }
    }

    entries
        .into_iter()
        .map(|(arn, entry)| {
            let resource_type = resolve_type(arn, &entry, notes);
            let (last_backup, last_backup_source, backup_vault_name) = match entry.evidence {
                Some(e) => (Some(e.at), Some(e.source), e.vault),
                None => (None, None, None),
            };
            let average_backup_size_bytes = (entry.backup_count > 0)
                .then(|| entry.total_size / entry.backup_count as u64);

            ProtectedResource {
                resource_arn: arn.to_string(),
                resource_id: short_resource_id(arn).to_string(),
                resource_type,
                last_backup,
                last_backup_source,
                backup_vault_name,
                backup_count: entry.backup_count,
                total_backup_size_bytes: entry.total_size,
                average_backup_size_bytes,
            }
        })
        .collect()
}

/// Pick the winning type and note any disagreement between feeds
fn resolve_type(
    arn: &str,
    entry: &ResourceEntry,
    notes: &mut Vec<DataQualityNote>,
) -> Option<String> {
    let chosen = entry
        .feed_type
        .as_ref()
        .or(entry.job_type.as_ref())
        .or(entry.point_type.as_ref())
        .cloned();

    if let Some(chosen) = &chosen {
        let conflicting: BTreeSet<&str> = [&entry.feed_type, &entry.job_type, &entry.point_type]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|t| *t != chosen.as_str())
            .collect();
        if !conflicting.is_empty() {
            notes.push(DataQualityNote::new(
                NoteKind::ResourceTypeConflict,
                arn,
                format!(
                    "feeds disagree on resource type; using {} over {}",
                    chosen,
                    conflicting.into_iter().collect::<Vec<_>>().join(", ")
                ),
            ));
        }
    }

    chosen
}

/// Resources without a successful backup, plus explicitly selected ARNs that
/// never showed up in any feed. Sorted by ARN, then reason.
pub(super) fn coverage_gaps(
    resources: &[ProtectedResource],
    selections: &[ResourceSelection],
) -> Vec<CoverageGap> {
    let mut gaps: BTreeMap<(String, GapReason), Option<String>> = BTreeMap::new();

    for resource in resources.iter().filter(|r| r.last_backup.is_none()) {
        gaps.insert(
            (resource.resource_arn.clone(), GapReason::NoSuccessfulBackup),
            None,
        );
    }

    let known: BTreeSet<&str> = resources.iter().map(|r| r.resource_arn.as_str()).collect();
    for selection in selections.iter().filter(|s| !s.orphaned) {
        for arn in &selection.resources {
            if arn.contains('*') || known.contains(arn.as_str()) {
                continue;
            }
            gaps.entry((arn.clone(), GapReason::SelectedButNeverBackedUp))
                .or_insert_with(|| selection.plan_id.clone());
        }
    }

    gaps.into_iter()
        .map(|((resource_arn, reason), plan_id)| CoverageGap {
            resource_arn,
            reason,
            plan_id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobStatus, RecoveryPointStatus};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn job(arn: &str, status: JobStatus, completed: Option<DateTime<Utc>>) -> BackupJob {
        BackupJob {
            id: Some(format!("job-{}", arn)),
            plan_id: None,
            plan_name: None,
            resource_arn: Some(arn.into()),
            resource_type: Some("EBS".into()),
            status,
            raw_status: None,
            status_message: None,
            creation_date: completed,
            completion_date: completed,
            backup_size_bytes: Some(100),
            backup_vault_name: Some("job-vault".into()),
            recovery_point_arn: None,
        }
    }

    fn point(arn: &str, completed: DateTime<Utc>) -> RecoveryPoint {
        RecoveryPoint {
            id: Some(format!("rp-{}", arn)),
            resource_arn: Some(arn.into()),
            resource_type: Some("EBS".into()),
            backup_vault_name: Some("rp-vault".into()),
            status: RecoveryPointStatus::Completed,
            creation_date: Some(completed),
            completion_date: Some(completed),
            size_bytes: None,
        }
    }

    #[test]
    fn test_equal_timestamps_prefer_job_feed() {
        let mut notes = Vec::new();
        let resources = build_resources(
            &[job("r1", JobStatus::Completed, Some(at(5)))],
            &[point("r1", at(5))],
            &[],
            &mut notes,
        );
        assert_eq!(resources[0].last_backup, Some(at(5)));
        assert_eq!(resources[0].last_backup_source, Some(LastBackupSource::Job));
        assert_eq!(resources[0].backup_vault_name.as_deref(), Some("job-vault"));
    }

    #[test]
    fn test_job_evidence_supersedes_equal_recovery_point() {
        let from_point = Evidence {
            at: at(5),
            source: LastBackupSource::RecoveryPoint,
            vault: None,
        };
        let from_job = Evidence {
            at: at(5),
            source: LastBackupSource::Job,
            vault: None,
        };
        assert!(from_job.supersedes(&from_point));
        assert!(!from_point.supersedes(&from_job));
    }

    #[test]
    fn test_later_recovery_point_wins() {
        let mut notes = Vec::new();
        let resources = build_resources(
            &[job("r1", JobStatus::Completed, Some(at(5)))],
            &[point("r1", at(6))],
            &[],
            &mut notes,
        );
        assert_eq!(resources[0].last_backup, Some(at(6)));
        assert_eq!(
            resources[0].last_backup_source,
            Some(LastBackupSource::RecoveryPoint)
        );
    }

    #[test]
    fn test_dedicated_feed_type_wins_and_conflict_is_noted() {
        let mut notes = Vec::new();
        let protected = vec![RawProtectedResource {
            resource_arn: Some("r1".into()),
            resource_type: Some("EC2".into()),
            last_backup_time: Some(at(23)),
            ..Default::default()
        }];
        let resources = build_resources(
            &[job("r1", JobStatus::Failed, Some(at(1)))],
            &[],
            &protected,
            &mut notes,
        );

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_type.as_deref(), Some("EC2"));
        // LastBackupTime from the dedicated feed is not evidence
        assert!(resources[0].last_backup.is_none());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NoteKind::ResourceTypeConflict);
    }

    #[test]
    fn test_sizes_and_counts_accumulate_per_resource() {
        let mut notes = Vec::new();
        let mut second = job("r1", JobStatus::Failed, None);
        second.backup_size_bytes = Some(300);
        let resources = build_resources(
            &[job("r1", JobStatus::Completed, Some(at(1))), second],
            &[],
            &[],
            &mut notes,
        );
        assert_eq!(resources[0].backup_count, 2);
        assert_eq!(resources[0].total_backup_size_bytes, 400);
        assert_eq!(resources[0].average_backup_size_bytes, Some(200));
    }

    #[test]
    fn test_coverage_gaps() {
        let mut notes = Vec::new();
        let resources = build_resources(
            &[
                job("r1", JobStatus::Completed, Some(at(1))),
                job("r2", JobStatus::Failed, Some(at(1))),
            ],
            &[],
            &[],
            &mut notes,
        );
        let selections = vec![ResourceSelection {
            id: Some("s1".into()),
            name: None,
            plan_id: Some("p1".into()),
            plan_name: None,
            orphaned: false,
            iam_role_arn: None,
            resources: vec!["r1".into(), "r3".into(), "arn:aws:ec2:*:*:volume/*".into()],
            not_resources: vec![],
            tag_conditions: vec![],
        }];

        let gaps = coverage_gaps(&resources, &selections);
        assert_eq!(
            gaps,
            vec![
                CoverageGap {
                    resource_arn: "r2".into(),
                    reason: GapReason::NoSuccessfulBackup,
                    plan_id: None,
                },
                CoverageGap {
                    resource_arn: "r3".into(),
                    reason: GapReason::SelectedButNeverBackedUp,
                    plan_id: Some("p1".into()),
                },
            ]
        );
    }
}
