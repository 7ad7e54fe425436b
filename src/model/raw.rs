//! Raw AWS Backup records
//!
//! Shapes mirror the AWS Backup REST responses (PascalCase keys). Every field
//! is optional so a record with missing data still deserializes; deciding what
//! a missing field means is the aggregation engine's job, not the decoder's.

use super::report::FetchWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The raw collections that make up one inventory snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Plans,
    Rules,
    Selections,
    Jobs,
    RecoveryPoints,
    ProtectedResources,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Self::Plans,
        Self::Rules,
        Self::Selections,
        Self::Jobs,
        Self::RecoveryPoints,
        Self::ProtectedResources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plans => "plans",
            Self::Rules => "rules",
            Self::Selections => "selections",
            Self::Jobs => "jobs",
            Self::RecoveryPoints => "recoveryPoints",
            Self::ProtectedResources => "protectedResources",
        }
    }

    /// A report cannot be built without this collection
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Jobs)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the fetcher produced for one run.
///
/// `None` means the collection is absent (never fetched, or its fetch failed);
/// `Some(vec![])` means it was fetched and is empty. The engine treats the two
/// differently.
#[derive(Debug, Clone, Default)]
pub struct RawInventory {
    pub plans: Option<Vec<RawPlan>>,
    pub rules: Option<Vec<RawRule>>,
    pub selections: Option<Vec<RawSelection>>,
    pub jobs: Option<Vec<RawJob>>,
    pub recovery_points: Option<Vec<RawRecoveryPoint>>,
    pub protected_resources: Option<Vec<RawProtectedResource>>,
    /// Job lookback window used when fetching, if any
    pub lookback_days: Option<u32>,
    /// Partial-fetch warnings raised while collecting
    pub warnings: Vec<FetchWarning>,
}

impl RawInventory {
    /// Whether a collection is absent
    pub fn is_absent(&self, collection: Collection) -> bool {
        match collection {
            Collection::Plans => self.plans.is_none(),
            Collection::Rules => self.rules.is_none(),
            Collection::Selections => self.selections.is_none(),
            Collection::Jobs => self.jobs.is_none(),
            Collection::RecoveryPoints => self.recovery_points.is_none(),
            Collection::ProtectedResources => self.protected_resources.is_none(),
        }
    }
}

/// Entry from ListBackupPlans
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawPlan {
    pub backup_plan_id: Option<String>,
    pub backup_plan_arn: Option<String>,
    pub backup_plan_name: Option<String>,
    pub version_id: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub last_execution_date: Option<DateTime<Utc>>,
}

/// Rule from GetBackupPlan, tagged with the plan it was listed under
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawRule {
    /// Set by the fetcher; not part of the API payload
    #[serde(skip)]
    pub plan_id: Option<String>,
    pub rule_name: Option<String>,
    pub rule_id: Option<String>,
    pub target_backup_vault_name: Option<String>,
    pub schedule_expression: Option<String>,
    pub start_window_minutes: Option<u64>,
    pub completion_window_minutes: Option<u64>,
    pub lifecycle: Option<RawLifecycle>,
    pub enable_continuous_backup: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawLifecycle {
    pub move_to_cold_storage_after_days: Option<u64>,
    pub delete_after_days: Option<u64>,
}

/// Selection body from GetBackupSelection
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawSelection {
    /// Set by the fetcher from the request path
    #[serde(skip)]
    pub plan_id: Option<String>,
    /// Set by the fetcher from the selection listing
    #[serde(skip)]
    pub selection_id: Option<String>,
    pub selection_name: Option<String>,
    pub iam_role_arn: Option<String>,
    pub resources: Vec<String>,
    pub not_resources: Vec<String>,
    pub list_of_tags: Vec<RawTagCondition>,
    pub conditions: Option<RawConditions>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawTagCondition {
    pub condition_type: Option<String>,
    pub condition_key: Option<String>,
    pub condition_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawConditions {
    pub string_equals: Vec<RawConditionParameter>,
    pub string_not_equals: Vec<RawConditionParameter>,
    pub string_like: Vec<RawConditionParameter>,
    pub string_not_like: Vec<RawConditionParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawConditionParameter {
    pub condition_key: Option<String>,
    pub condition_value: Option<String>,
}

/// Entry from ListBackupJobs
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawJob {
    pub backup_job_id: Option<String>,
    pub backup_vault_name: Option<String>,
    pub recovery_point_arn: Option<String>,
    pub resource_arn: Option<String>,
    pub resource_type: Option<String>,
    pub state: Option<String>,
    pub status_message: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub completion_date: Option<DateTime<Utc>>,
    pub backup_size_in_bytes: Option<u64>,
    pub created_by: Option<RawCreatedBy>,
}

impl RawJob {
    /// Plan that launched this job, if the API recorded one
    pub fn plan_id(&self) -> Option<&str> {
        self.created_by
            .as_ref()
            .and_then(|c| c.backup_plan_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawCreatedBy {
    pub backup_plan_id: Option<String>,
    pub backup_plan_arn: Option<String>,
    pub backup_plan_version: Option<String>,
    pub backup_rule_id: Option<String>,
}

/// Entry from ListRecoveryPointsByBackupVault
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawRecoveryPoint {
    pub recovery_point_arn: Option<String>,
    pub backup_vault_name: Option<String>,
    pub resource_arn: Option<String>,
    pub resource_type: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub completion_date: Option<DateTime<Utc>>,
    pub backup_size_in_bytes: Option<u64>,
}

/// Entry from ListProtectedResources
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawProtectedResource {
    pub resource_arn: Option<String>,
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub last_backup_time: Option<DateTime<Utc>>,
}

/// Lenient timestamp decoding.
///
/// AWS REST-JSON encodes timestamps as epoch seconds (possibly fractional);
/// ISO-8601 strings are accepted too. Anything else decodes as absent.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(parse))
    }

    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Number(n) => n.as_f64().and_then(from_epoch_seconds),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().and_then(from_epoch_seconds)),
            _ => None,
        }
    }

    fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        // Millisecond precision is all the API carries
        let millis = ((secs - whole) * 1000.0).round() as u32;
        DateTime::from_timestamp(whole as i64, millis.min(999) * 1_000_000)
    }
}
