//! Job and recovery point normalization

use crate::model::{
    BackupJob, BackupPlan, DataQualityNote, JobStatus, NoteKind, RawJob, RawRecoveryPoint,
    RecoveryPoint, RecoveryPointStatus,
};
use std::collections::HashMap;

/// Normalize jobs in input order, resolving plan names where the plan still exists
pub(super) fn normalize_jobs(
    raw_jobs: &[RawJob],
    plans: &[BackupPlan],
    notes: &mut Vec<DataQualityNote>,
) -> Vec<BackupJob> {
    let plan_names: HashMap<&str, Option<&str>> = plans
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_deref()))
        .collect();

    raw_jobs
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let id = raw.backup_job_id.clone().filter(|id| !id.is_empty());
            let subject = id.clone().unwrap_or_else(|| format!("job #{}", idx + 1));

            if id.is_none() {
                notes.push(DataQualityNote::new(
                    NoteKind::MissingIdentifier,
                    &subject,
                    "job has no BackupJobId",
                ));
            }

            let resource_arn = raw.resource_arn.clone().filter(|arn| !arn.is_empty());
            if resource_arn.is_none() {
                notes.push(DataQualityNote::new(
                    NoteKind::MissingIdentifier,
                    &subject,
                    "job has no ResourceArn; excluded from resource coverage",
                ));
            }

            let status = raw
                .state
                .as_deref()
                .map(JobStatus::parse)
                .unwrap_or(JobStatus::Unknown);
            let raw_status = if status == JobStatus::Unknown {
                notes.push(DataQualityNote::new(
                    NoteKind::UnknownJobStatus,
                    &subject,
                    format!(
                        "unrecognized state {:?}; counted as UNKNOWN",
                        raw.state.as_deref().unwrap_or("<none>")
                    ),
                ));
                raw.state.clone()
            } else {
                None
            };

            if status.is_terminal_success() && raw.completion_date.is_none() {
                notes.push(DataQualityNote::new(
                    NoteKind::MissingCompletionDate,
                    &subject,
                    "COMPLETED job without CompletionDate; not used for last backup",
                ));
            }

            let plan_id = raw.plan_id().map(str::to_string);
            let plan_name = plan_id
                .as_deref()
                .and_then(|id| plan_names.get(id).copied().flatten())
                .map(str::to_string);

            BackupJob {
                id,
                plan_id,
                plan_name,
                resource_arn,
                resource_type: raw.resource_type.clone(),
                status,
                raw_status,
                status_message: raw.status_message.clone(),
                creation_date: raw.creation_date,
                completion_date: raw.completion_date,
                backup_size_bytes: raw.backup_size_in_bytes,
                backup_vault_name: raw.backup_vault_name.clone(),
                recovery_point_arn: raw.recovery_point_arn.clone(),
            }
        })
        .collect()
}

/// Normalize recovery points in input order
pub(super) fn normalize_recovery_points(
    raw_points: &[RawRecoveryPoint],
    notes: &mut Vec<DataQualityNote>,
) -> Vec<RecoveryPoint> {
    raw_points
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let id = raw.recovery_point_arn.clone().filter(|id| !id.is_empty());
            let subject = id
                .clone()
                .unwrap_or_else(|| format!("recovery point #{}", idx + 1));

            if id.is_none() {
                notes.push(DataQualityNote::new(
                    NoteKind::MissingIdentifier,
                    &subject,
                    "recovery point has no RecoveryPointArn",
                ));
            }

            let status = raw
                .status
                .as_deref()
                .map(RecoveryPointStatus::parse)
                .unwrap_or(RecoveryPointStatus::Unknown);
            if status == RecoveryPointStatus::Unknown {
                notes.push(DataQualityNote::new(
                    NoteKind::UnknownRecoveryPointStatus,
                    &subject,
                    format!(
                        "unrecognized status {:?}",
                        raw.status.as_deref().unwrap_or("<none>")
                    ),
                ));
            }

            RecoveryPoint {
                id,
                resource_arn: raw.resource_arn.clone().filter(|arn| !arn.is_empty()),
                resource_type: raw.resource_type.clone(),
                backup_vault_name: raw.backup_vault_name.clone(),
                status,
                creation_date: raw.creation_date,
                completion_date: raw.completion_date,
                size_bytes: raw.backup_size_in_bytes,
            }
        })
        .collect()
}
