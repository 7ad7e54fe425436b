//! End-to-end aggregation scenarios
//!
//! Each test builds a raw inventory by hand, runs it through the engine and
//! checks the derived report, including its serialized JSON shape.

use aws_backup_report::model::{
    BackupPlan, Collection, GapReason, JobStatus, LastBackupSource, NoteKind, ProtectedResource,
    RawCreatedBy, RawJob, RawPlan, RawProtectedResource, RawRecoveryPoint, RawRule, RawSelection,
};
use aws_backup_report::render::to_json_string;
use aws_backup_report::{aggregate_with_clock, BackupReport, RawInventory, ReportError};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

const VOL_A: &str = "arn:aws:ec2:us-east-1:123456789012:volume/vol-a";
const VOL_B: &str = "arn:aws:ec2:us-east-1:123456789012:volume/vol-b";
const DB: &str = "arn:aws:rds:us-east-1:123456789012:db:orders";

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn resource<'a>(report: &'a BackupReport, arn: &str) -> &'a ProtectedResource {
    report
        .protected_resources
        .iter()
        .find(|r| r.resource_arn == arn)
        .unwrap_or_else(|| panic!("no resource {}", arn))
}

fn plan<'a>(report: &'a BackupReport, id: &str) -> &'a BackupPlan {
    report
        .plans
        .iter()
        .find(|p| p.id == id)
        .unwrap_or_else(|| panic!("no plan {}", id))
}

fn job(id: &str, arn: &str, state: &str, completed: Option<DateTime<Utc>>) -> RawJob {
    RawJob {
        backup_job_id: Some(id.into()),
        resource_arn: Some(arn.into()),
        resource_type: Some("EBS".into()),
        state: Some(state.into()),
        creation_date: completed.or(Some(at(1, 0))),
        completion_date: completed,
        backup_size_in_bytes: Some(1000),
        backup_vault_name: Some("Default".into()),
        ..Default::default()
    }
}

fn point(arn: &str, status: &str, completed: DateTime<Utc>) -> RawRecoveryPoint {
    RawRecoveryPoint {
        recovery_point_arn: Some(format!("rp-{}", arn)),
        resource_arn: Some(arn.into()),
        resource_type: Some("EBS".into()),
        backup_vault_name: Some("Default".into()),
        status: Some(status.into()),
        creation_date: Some(completed),
        completion_date: Some(completed),
        ..Default::default()
    }
}

/// Inventory with every collection present and empty
fn empty_inventory() -> RawInventory {
    RawInventory {
        plans: Some(vec![]),
        rules: Some(vec![]),
        selections: Some(vec![]),
        jobs: Some(vec![]),
        recovery_points: Some(vec![]),
        protected_resources: Some(vec![]),
        lookback_days: Some(90),
        ..Default::default()
    }
}

fn sample_inventory() -> RawInventory {
    RawInventory {
        plans: Some(vec![RawPlan {
            backup_plan_id: Some("p1".into()),
            backup_plan_name: Some("Daily".into()),
            ..Default::default()
        }]),
        rules: Some(vec![RawRule {
            plan_id: Some("p1".into()),
            rule_name: Some("daily".into()),
            target_backup_vault_name: Some("Default".into()),
            ..Default::default()
        }]),
        selections: Some(vec![
            RawSelection {
                plan_id: Some("p1".into()),
                selection_id: Some("s1".into()),
                selection_name: Some("volumes".into()),
                resources: vec![VOL_A.into(), VOL_B.into()],
                ..Default::default()
            },
            RawSelection {
                plan_id: Some("deleted".into()),
                selection_id: Some("s2".into()),
                selection_name: Some("leftover".into()),
                ..Default::default()
            },
        ]),
        jobs: Some(vec![
            RawJob {
                created_by: Some(RawCreatedBy {
                    backup_plan_id: Some("p1".into()),
                    ..Default::default()
                }),
                ..job("j1", VOL_A, "COMPLETED", Some(at(3, 1)))
            },
            job("j2", VOL_A, "FAILED", Some(at(4, 1))),
            job("j3", DB, "RUNNING", None),
        ]),
        recovery_points: Some(vec![point(VOL_A, "COMPLETED", at(2, 1))]),
        protected_resources: Some(vec![RawProtectedResource {
            resource_arn: Some(DB.into()),
            resource_type: Some("RDS".into()),
            ..Default::default()
        }]),
        lookback_days: Some(90),
        ..Default::default()
    }
}

mod last_backup_tests {
    use super::*;

    /// A later failure never moves the last backup forward, and an older
    /// recovery point does not override a newer successful job
    #[test]
    fn test_last_backup_is_latest_success() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();

        let resource = resource(&report, VOL_A);
        assert_eq!(resource.last_backup, Some(at(3, 1)));
        assert_eq!(resource.last_backup_source, Some(LastBackupSource::Job));
        assert_eq!(resource.backup_count, 2);
        assert_eq!(resource.total_backup_size_bytes, 2000);
    }

    /// A resource with only non-success records has no last backup
    #[test]
    fn test_no_success_means_no_last_backup() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();

        let db = resource(&report, DB);
        assert!(db.last_backup.is_none());
        assert!(db.last_backup_source.is_none());
        assert_eq!(db.resource_type.as_deref(), Some("RDS"));
        assert_eq!(db.resource_id, "orders");
    }

    /// AVAILABLE recovery points count as successful backups
    #[test]
    fn test_available_recovery_point_is_success() {
        let inventory = RawInventory {
            recovery_points: Some(vec![point(VOL_B, "AVAILABLE", at(10, 0))]),
            ..empty_inventory()
        };
        let report = aggregate_with_clock(&inventory, "us-east-1", fixed_clock).unwrap();

        let resource = resource(&report, VOL_B);
        assert_eq!(resource.last_backup, Some(at(10, 0)));
        assert_eq!(
            resource.last_backup_source,
            Some(LastBackupSource::RecoveryPoint)
        );
        assert_eq!(resource.backup_count, 0);
    }
}

mod summary_tests {
    use super::*;

    /// An empty job list is a valid report with all-zero counts
    #[test]
    fn test_empty_jobs_is_valid() {
        let report = aggregate_with_clock(&empty_inventory(), "us-east-1", fixed_clock).unwrap();

        assert_eq!(report.job_summary.total, 0);
        for status in JobStatus::ALL {
            assert_eq!(report.job_summary.count(status), 0);
        }
        assert!(report.protected_resources.is_empty());
        assert!(report.diagnostics.is_clean());
    }

    /// Without a job list there is no report
    #[test]
    fn test_absent_jobs_fails() {
        let inventory = RawInventory {
            jobs: None,
            ..empty_inventory()
        };
        let err = aggregate_with_clock(&inventory, "us-east-1", fixed_clock).unwrap_err();

        assert!(matches!(
            err,
            ReportError::MissingRequiredData {
                collection: Collection::Jobs
            }
        ));
        assert_eq!(err.exit_code(), 3);
    }

    /// Unrecognized states are counted, not dropped
    #[test]
    fn test_unknown_status_counted() {
        let inventory = RawInventory {
            jobs: Some(vec![
                job("j1", VOL_A, "COMPLETED", Some(at(1, 1))),
                job("j2", VOL_A, "WEIRD_STATUS", None),
            ]),
            ..empty_inventory()
        };
        let report = aggregate_with_clock(&inventory, "us-east-1", fixed_clock).unwrap();

        assert_eq!(report.job_summary.count(JobStatus::Unknown), 1);
        assert_eq!(report.job_summary.count(JobStatus::Completed), 1);
        assert_eq!(report.job_summary.total, 2);
        assert_eq!(report.jobs[1].raw_status.as_deref(), Some("WEIRD_STATUS"));
        assert_eq!(
            report.diagnostics.notes_of(NoteKind::UnknownJobStatus).count(),
            1
        );
    }

    /// Jobs keep their input order
    #[test]
    fn test_job_order_preserved() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();
        let ids: Vec<_> = report.jobs.iter().map(|j| j.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("j1"), Some("j2"), Some("j3")]);
        assert_eq!(report.jobs[0].plan_name.as_deref(), Some("Daily"));
    }

    /// COMPLETED jobs whose message mentions an issue are counted separately
    #[test]
    fn test_completed_with_issues() {
        let inventory = RawInventory {
            jobs: Some(vec![
                RawJob {
                    status_message: Some("Backup completed with issues".into()),
                    ..job("j1", VOL_A, "COMPLETED", Some(at(1, 1)))
                },
                job("j2", VOL_A, "COMPLETED", Some(at(2, 1))),
            ]),
            ..empty_inventory()
        };
        let report = aggregate_with_clock(&inventory, "us-east-1", fixed_clock).unwrap();
        assert_eq!(report.statistics.completed_with_issues, 1);
        assert_eq!(report.job_summary.count(JobStatus::Completed), 2);
    }
}

mod reconciliation_tests {
    use super::*;

    /// Selections whose plan is gone are kept and flagged
    #[test]
    fn test_orphaned_selection_present() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();

        assert_eq!(report.selections.len(), 2);
        let orphan = &report.selections[1];
        assert!(orphan.orphaned);
        assert_eq!(orphan.plan_id.as_deref(), Some("deleted"));
        assert_eq!(report.statistics.orphaned_selection_count, 1);
        assert_eq!(plan(&report, "p1").selection_count, 1);
    }

    /// A resource seen by several feeds appears once
    #[test]
    fn test_no_duplicate_arns_across_feeds() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();

        let arns: Vec<_> = report
            .protected_resources
            .iter()
            .map(|r| r.resource_arn.as_str())
            .collect();
        assert_eq!(arns, vec![VOL_A, DB]);
        assert_eq!(report.statistics.unique_resource_count, 2);
    }

    /// Selected ARNs that no feed ever mentions are coverage gaps
    #[test]
    fn test_selected_but_never_backed_up() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();

        let gap = report
            .coverage_gaps
            .iter()
            .find(|g| g.resource_arn == VOL_B)
            .unwrap();
        assert_eq!(gap.reason, GapReason::SelectedButNeverBackedUp);
        assert_eq!(gap.plan_id.as_deref(), Some("p1"));
        assert!(report
            .coverage_gaps
            .iter()
            .any(|g| g.resource_arn == DB && g.reason == GapReason::NoSuccessfulBackup));
    }
}

mod serialization_tests {
    use super::*;

    /// Same input and clock give byte-identical JSON
    #[test]
    fn test_output_is_deterministic() {
        let first = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();
        let second = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();

        assert_eq!(
            to_json_string(&first).unwrap(),
            to_json_string(&second).unwrap()
        );
    }

    /// Keys are camelCase and the job summary is flat
    #[test]
    fn test_json_shape() {
        let report = aggregate_with_clock(&sample_inventory(), "us-east-1", fixed_clock).unwrap();
        let value: Value = serde_json::from_str(&to_json_string(&report).unwrap()).unwrap();

        for key in [
            "region",
            "generatedAt",
            "lookbackDays",
            "plans",
            "selections",
            "jobs",
            "recoveryPoints",
            "protectedResources",
            "jobSummary",
            "statistics",
            "coverageGaps",
            "monthlyUsage",
            "diagnostics",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }

        assert_eq!(value["generatedAt"], "2024-06-01T12:00:00Z");
        assert_eq!(value["jobSummary"]["total"], 3);
        assert_eq!(value["jobSummary"]["COMPLETED"], 1);
        assert_eq!(value["jobSummary"]["UNKNOWN"], 0);
        assert_eq!(value["protectedResources"][0]["lastBackupSource"], "JOB");
        // Absent values are explicit nulls
        assert!(value["protectedResources"][1]["lastBackup"].is_null());
        assert_eq!(value["diagnostics"]["incompleteCollections"], Value::Array(vec![]));
    }
}
