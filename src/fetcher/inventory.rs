//! Concurrent fetch of every AWS Backup collection
//!
//! The four top-level trees (plans with their rules and selections, jobs,
//! vaults with their recovery points, protected resources) are fetched
//! concurrently into separate buffers. Per-plan and per-vault calls fan out
//! with bounded concurrency and keep listing order.
//!
//! A failure on one collection leaves that collection absent (or partial) and
//! records a [`FetchWarning`]; an authorization failure anywhere aborts the
//! whole fetch.

use super::collections::Listing;
use super::paginate::{fetch_all, fetch_one};
use crate::aws::auth::check_region;
use crate::aws::{format_aws_error, AwsError, BackupClient};
use crate::error::{ReportError, ReportResult};
use crate::model::{
    Collection, FetchWarning, RawInventory, RawJob, RawPlan, RawProtectedResource,
    RawRecoveryPoint, RawRule, RawSelection,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

/// Default job lookback window in days
pub const DEFAULT_LOOKBACK_DAYS: u32 = 90;

/// Options for [`fetch_inventory`]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only jobs created within this many days are listed
    pub lookback_days: u32,
    /// Maximum in-flight per-plan / per-vault requests
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            concurrency: 4,
        }
    }
}

/// Lower bound for job creation dates, as sent in `createdAfter`
pub fn created_after(now: DateTime<Utc>, lookback_days: u32) -> String {
    (now - Duration::days(i64::from(lookback_days))).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One collection's items (`None` when the listing failed) and its warnings
struct Fetched<T> {
    items: Option<Vec<T>>,
    warnings: Vec<FetchWarning>,
}

impl<T> Fetched<T> {
    fn failed(warning: FetchWarning) -> Self {
        Self {
            items: None,
            warnings: vec![warning],
        }
    }
}

/// Authorization failures are fatal; anything else becomes a warning.
///
/// User-facing messages carry only the generic [`format_aws_error`] text; the
/// raw service error goes to the log.
fn triage(collection: Collection, context: &str, err: AwsError) -> ReportResult<FetchWarning> {
    if err.is_auth() {
        tracing::error!("Authorization failed for {} ({}): {}", collection, context, err);
        return Err(ReportError::Unauthorized {
            collection,
            message: format_aws_error(&err),
        });
    }
    tracing::warn!("Failed to fetch {} ({}): {}", collection, context, err);
    Ok(FetchWarning::new(
        collection,
        format!("{}: {}", context, format_aws_error(&err)),
    ))
}

/// Decode raw JSON items, skipping (and counting) the ones that don't fit
fn decode<T: DeserializeOwned>(
    collection: Collection,
    items: Vec<Value>,
    warnings: &mut Vec<FetchWarning>,
) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Skipping undecodable {} record: {}", collection, e);
                None
            }
        })
        .collect();

    let skipped = total - decoded.len();
    if skipped > 0 {
        warnings.push(FetchWarning::new(
            collection,
            format!("skipped {} of {} records that could not be decoded", skipped, total),
        ));
    }
    decoded
}

async fn fetch_collection<T: DeserializeOwned>(
    client: &BackupClient,
    listing: Listing,
) -> ReportResult<Fetched<T>> {
    let collection = listing.collection();
    match fetch_all(client, &listing).await {
        Ok(items) => {
            let mut warnings = Vec::new();
            let items: Vec<T> = decode(collection, items, &mut warnings);
            tracing::info!("Fetched {} {}", items.len(), collection);
            Ok(Fetched {
                items: Some(items),
                warnings,
            })
        }
        Err(err) => Ok(Fetched::failed(triage(
            collection,
            &listing.to_string(),
            err,
        )?)),
    }
}

#[derive(Default)]
struct PlanDetail {
    rules: Vec<RawRule>,
    selections: Vec<RawSelection>,
    warnings: Vec<FetchWarning>,
}

async fn fetch_plan_detail(client: &BackupClient, plan_id: String) -> ReportResult<PlanDetail> {
    let mut detail = PlanDetail::default();

    let listing = Listing::Plan {
        plan_id: plan_id.clone(),
    };
    match fetch_all(client, &listing).await {
        Ok(items) => {
            detail.rules = decode(Collection::Rules, items, &mut detail.warnings);
            for rule in &mut detail.rules {
                rule.plan_id = Some(plan_id.clone());
            }
        }
        Err(err) => {
            let warning = triage(Collection::Rules, &format!("plan {}", plan_id), err)?;
            detail.warnings.push(warning);
        }
    }

    let listing = Listing::Selections {
        plan_id: plan_id.clone(),
    };
    let summaries = match fetch_all(client, &listing).await {
        Ok(items) => items,
        Err(err) => {
            let warning = triage(Collection::Selections, &format!("plan {}", plan_id), err)?;
            detail.warnings.push(warning);
            return Ok(detail);
        }
    };

    let mut skipped = 0;
    for summary in summaries {
        let Some(selection_id) = summary
            .get("SelectionId")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            skipped += 1;
            continue;
        };

        let listing = Listing::Selection {
            plan_id: plan_id.clone(),
            selection_id: selection_id.clone(),
        };
        // The list entry only has name and role; fall back to it if the detail call fails
        let body = match fetch_one(client, &listing).await {
            Ok(Some(body)) => body,
            Ok(None) => summary,
            Err(err) => {
                let context = format!("selection {} of plan {}", selection_id, plan_id);
                detail
                    .warnings
                    .push(triage(Collection::Selections, &context, err)?);
                summary
            }
        };

        match serde_json::from_value::<RawSelection>(body) {
            Ok(mut selection) => {
                selection.plan_id = Some(plan_id.clone());
                selection.selection_id = Some(selection_id);
                detail.selections.push(selection);
            }
            Err(e) => {
                tracing::debug!("Skipping undecodable selection {}: {}", selection_id, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        detail.warnings.push(FetchWarning::new(
            Collection::Selections,
            format!("plan {}: skipped {} unreadable selections", plan_id, skipped),
        ));
    }

    Ok(detail)
}

struct PlanTree {
    plans: Fetched<RawPlan>,
    rules: Fetched<RawRule>,
    selections: Fetched<RawSelection>,
}

async fn fetch_plan_tree(client: &BackupClient, concurrency: usize) -> ReportResult<PlanTree> {
    let plans: Fetched<RawPlan> = fetch_collection(client, Listing::Plans).await?;

    if plans.items.is_none() {
        const SKIPPED: &str = "not fetched because the plan listing failed";
        return Ok(PlanTree {
            plans,
            rules: Fetched::failed(FetchWarning::new(Collection::Rules, SKIPPED)),
            selections: Fetched::failed(FetchWarning::new(Collection::Selections, SKIPPED)),
        });
    }

    let mut seen = HashSet::new();
    let plan_ids: Vec<String> = plans
        .items
        .iter()
        .flatten()
        .filter_map(|p| p.backup_plan_id.clone())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect();

    let details: Vec<PlanDetail> = stream::iter(plan_ids)
        .map(|plan_id| fetch_plan_detail(client, plan_id))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut rules = Fetched {
        items: Some(Vec::new()),
        warnings: Vec::new(),
    };
    let mut selections = Fetched {
        items: Some(Vec::new()),
        warnings: Vec::new(),
    };
    for detail in details {
        rules.items.get_or_insert_with(Vec::new).extend(detail.rules);
        selections
            .items
            .get_or_insert_with(Vec::new)
            .extend(detail.selections);
        for warning in detail.warnings {
            match warning.collection {
                Collection::Rules => rules.warnings.push(warning),
                _ => selections.warnings.push(warning),
            }
        }
    }

    tracing::info!(
        "Fetched {} rules and {} selections",
        rules.items.as_ref().map_or(0, Vec::len),
        selections.items.as_ref().map_or(0, Vec::len)
    );

    Ok(PlanTree {
        plans,
        rules,
        selections,
    })
}

async fn fetch_vault_points(
    client: &BackupClient,
    vault: String,
) -> ReportResult<(Vec<RawRecoveryPoint>, Vec<FetchWarning>)> {
    let mut warnings = Vec::new();
    let listing = Listing::RecoveryPoints {
        vault: vault.clone(),
    };

    match fetch_all(client, &listing).await {
        Ok(items) => {
            let mut points: Vec<RawRecoveryPoint> =
                decode(Collection::RecoveryPoints, items, &mut warnings);
            for point in &mut points {
                point.backup_vault_name.get_or_insert_with(|| vault.clone());
            }
            Ok((points, warnings))
        }
        Err(err) => {
            warnings.push(triage(
                Collection::RecoveryPoints,
                &format!("vault {}", vault),
                err,
            )?);
            Ok((Vec::new(), warnings))
        }
    }
}

async fn fetch_recovery_points(
    client: &BackupClient,
    concurrency: usize,
) -> ReportResult<Fetched<RawRecoveryPoint>> {
    let vaults = match fetch_all(client, &Listing::Vaults).await {
        Ok(vaults) => vaults,
        Err(err) => {
            return Ok(Fetched::failed(triage(
                Collection::RecoveryPoints,
                "vault listing",
                err,
            )?))
        }
    };

    let names: Vec<String> = vaults
        .iter()
        .filter_map(|v| v.get("BackupVaultName").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    tracing::debug!("Listing recovery points in {} vaults", names.len());

    let per_vault: Vec<(Vec<RawRecoveryPoint>, Vec<FetchWarning>)> = stream::iter(names)
        .map(|vault| fetch_vault_points(client, vault))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut items = Vec::new();
    let mut warnings = Vec::new();
    for (points, vault_warnings) in per_vault {
        items.extend(points);
        warnings.extend(vault_warnings);
    }
    tracing::info!("Fetched {} recoveryPoints", items.len());

    Ok(Fetched {
        items: Some(items),
        warnings,
    })
}

/// Fetch every collection for the client's region.
///
/// Returns [`ReportError::Unauthorized`] as soon as any call is rejected for
/// credentials or permissions. Every other failure is folded into the
/// inventory's warnings.
pub async fn fetch_inventory(
    client: &BackupClient,
    options: &FetchOptions,
) -> ReportResult<RawInventory> {
    check_region(client.region())?;

    let jobs_listing = Listing::Jobs {
        created_after: created_after(Utc::now(), options.lookback_days),
    };

    let (tree, jobs, recovery_points, protected_resources) = tokio::try_join!(
        fetch_plan_tree(client, options.concurrency),
        fetch_collection::<RawJob>(client, jobs_listing),
        fetch_recovery_points(client, options.concurrency),
        fetch_collection::<RawProtectedResource>(client, Listing::ProtectedResources),
    )?;

    let mut warnings = Vec::new();
    warnings.extend(tree.plans.warnings);
    warnings.extend(tree.rules.warnings);
    warnings.extend(tree.selections.warnings);
    warnings.extend(jobs.warnings);
    warnings.extend(recovery_points.warnings);
    warnings.extend(protected_resources.warnings);

    Ok(RawInventory {
        plans: tree.plans.items,
        rules: tree.rules.items,
        selections: tree.selections.items,
        jobs: jobs.items,
        recovery_points: recovery_points.items,
        protected_resources: protected_resources.items,
        lookback_days: Some(options.lookback_days),
        warnings,
    })
}
