//! Status enumerations
//!
//! AWS returns job and recovery point states as free-form strings. They are
//! parsed once, at normalization time, into closed enums; anything we do not
//! recognize lands in `Unknown` instead of failing the run.

use serde::Serialize;
use std::fmt;

/// Backup job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Pending,
    Running,
    Aborting,
    Aborted,
    Completed,
    Failed,
    Expired,
    Partial,
    Unknown,
}

impl JobStatus {
    /// Every bucket, in report order
    pub const ALL: [JobStatus; 10] = [
        Self::Created,
        Self::Pending,
        Self::Running,
        Self::Aborting,
        Self::Aborted,
        Self::Completed,
        Self::Failed,
        Self::Expired,
        Self::Partial,
        Self::Unknown,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Self::Created,
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "ABORTING" => Self::Aborting,
            "ABORTED" => Self::Aborted,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "EXPIRED" => Self::Expired,
            "PARTIAL" => Self::Partial,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Aborting => "ABORTING",
            Self::Aborted => "ABORTED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
            Self::Partial => "PARTIAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Completed, non-retryable success
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recovery point state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryPointStatus {
    Completed,
    Available,
    Partial,
    Creating,
    Stopped,
    Deleting,
    Expired,
    Unknown,
}

impl RecoveryPointStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => Self::Completed,
            "AVAILABLE" => Self::Available,
            "PARTIAL" => Self::Partial,
            "CREATING" => Self::Creating,
            "STOPPED" => Self::Stopped,
            "DELETING" => Self::Deleting,
            "EXPIRED" => Self::Expired,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Available => "AVAILABLE",
            Self::Partial => "PARTIAL",
            Self::Creating => "CREATING",
            Self::Stopped => "STOPPED",
            Self::Deleting => "DELETING",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// A restorable point in time
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Available)
    }
}

impl fmt::Display for RecoveryPointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which feed supplied a resource's last-backup timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LastBackupSource {
    Job,
    RecoveryPoint,
}

impl LastBackupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "JOB",
            Self::RecoveryPoint => "RECOVERY_POINT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parse_is_case_insensitive() {
        assert_eq!(JobStatus::parse("completed"), JobStatus::Completed);
        assert_eq!(JobStatus::parse(" FAILED "), JobStatus::Failed);
        assert_eq!(JobStatus::parse("WEIRD_STATUS"), JobStatus::Unknown);
        assert_eq!(JobStatus::parse(""), JobStatus::Unknown);
    }

    #[test]
    fn test_every_status_round_trips_through_as_str() {
        for status in JobStatus::ALL {
            assert_eq!(JobStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_only_completed_jobs_count_as_success() {
        let successes: Vec<_> = JobStatus::ALL
            .iter()
            .filter(|s| s.is_terminal_success())
            .collect();
        assert_eq!(successes, vec![&JobStatus::Completed]);
    }

    #[test]
    fn test_recovery_point_success_states() {
        assert!(RecoveryPointStatus::parse("COMPLETED").is_terminal_success());
        assert!(RecoveryPointStatus::parse("AVAILABLE").is_terminal_success());
        assert!(!RecoveryPointStatus::parse("PARTIAL").is_terminal_success());
        assert!(!RecoveryPointStatus::parse("EXPIRED").is_terminal_success());
    }

    #[test]
    fn test_status_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&JobStatus::Aborting).unwrap();
        assert_eq!(json, "\"ABORTING\"");
        let json = serde_json::to_string(&LastBackupSource::RecoveryPoint).unwrap();
        assert_eq!(json, "\"RECOVERY_POINT\"");
    }
}
