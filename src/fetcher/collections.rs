//! AWS Backup listing registry
//!
//! Each [`Listing`] knows its REST path, query parameters and where its items
//! live in the response body.

use crate::model::Collection;
use std::fmt;

/// One AWS Backup read call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// `GET /backup/plans/`
    Plans,
    /// `GET /backup/plans/{id}/`, which carries the plan's rules
    Plan { plan_id: String },
    /// `GET /backup/plans/{id}/selections/`
    Selections { plan_id: String },
    /// `GET /backup/plans/{id}/selections/{selectionId}`
    Selection {
        plan_id: String,
        selection_id: String,
    },
    /// `GET /backup-jobs/?createdAfter=...`
    Jobs { created_after: String },
    /// `GET /backup-vaults/`
    Vaults,
    /// `GET /backup-vaults/{name}/recovery-points/`
    RecoveryPoints { vault: String },
    /// `GET /resources/`
    ProtectedResources,
}

impl Listing {
    /// Collection this call feeds
    pub fn collection(&self) -> Collection {
        match self {
            Self::Plans => Collection::Plans,
            Self::Plan { .. } => Collection::Rules,
            Self::Selections { .. } | Self::Selection { .. } => Collection::Selections,
            Self::Jobs { .. } => Collection::Jobs,
            Self::Vaults | Self::RecoveryPoints { .. } => Collection::RecoveryPoints,
            Self::ProtectedResources => Collection::ProtectedResources,
        }
    }

    /// Raw (unencoded) path segments
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Self::Plans => vec!["backup", "plans"],
            Self::Plan { plan_id } => vec!["backup", "plans", plan_id.as_str()],
            Self::Selections { plan_id } => vec!["backup", "plans", plan_id.as_str(), "selections"],
            Self::Selection {
                plan_id,
                selection_id,
            } => vec![
                "backup",
                "plans",
                plan_id.as_str(),
                "selections",
                selection_id.as_str(),
            ],
            Self::Jobs { .. } => vec!["backup-jobs"],
            Self::Vaults => vec!["backup-vaults"],
            Self::RecoveryPoints { vault } => vec!["backup-vaults", vault.as_str(), "recovery-points"],
            Self::ProtectedResources => vec!["resources"],
        }
    }

    /// Every path except a single selection ends in `/`
    pub fn trailing_slash(&self) -> bool {
        !matches!(self, Self::Selection { .. })
    }

    pub fn query(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Jobs { created_after } => vec![("createdAfter", created_after.as_str())],
            _ => vec![],
        }
    }

    /// Dot-separated path to the items in the response body
    pub fn response_path(&self) -> &'static str {
        match self {
            Self::Plans => "BackupPlansList",
            Self::Plan { .. } => "BackupPlan.Rules",
            Self::Selections { .. } => "BackupSelectionsList",
            Self::Selection { .. } => "BackupSelection",
            Self::Jobs { .. } => "BackupJobs",
            Self::Vaults => "BackupVaultList",
            Self::RecoveryPoints { .. } => "RecoveryPoints",
            Self::ProtectedResources => "Results",
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments().join("/"))?;
        if self.trailing_slash() {
            write!(f, "/")?;
        }
        Ok(())
    }
}
