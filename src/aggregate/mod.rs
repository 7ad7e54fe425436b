//! Normalization & aggregation engine
//!
//! Turns a [`RawInventory`] into an immutable [`BackupReport`]. The raw feeds
//! are keyed by different identifiers (plan id, job id, resource ARN), carry
//! optional fields everywhere, and reference each other loosely. This module
//! reconciles them in one explicit pass:
//!
//! 1. attach rules to plans by plan id ([`plans`])
//! 2. resolve selection back-references, tagging orphans ([`plans`])
//! 3. normalize jobs and recovery points, parsing statuses ([`jobs`])
//! 4. deduplicate protected resources by ARN and derive last-backup facts ([`resources`])
//! 5. tally the job summary and statistics ([`summary`])
//!
//! The engine never reads the environment, the clock (except through the
//! injected clock), or the network. Malformed records are kept and described
//! by a [`DataQualityNote`]; the only hard failure is an absent job list.

mod jobs;
mod plans;
mod resources;
mod summary;

use crate::error::{ReportError, ReportResult};
use crate::model::{
    BackupReport, Collection, DataQualityNote, Diagnostics, FetchWarning, RawInventory,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Aggregate raw records into a report stamped with the current time
pub fn aggregate(inventory: &RawInventory, region: &str) -> ReportResult<BackupReport> {
    aggregate_with_clock(inventory, region, Utc::now)
}

/// Aggregate raw records, taking the generation timestamp from `clock`.
///
/// `clock` is called once, after every derived value has been computed.
pub fn aggregate_with_clock<F>(
    inventory: &RawInventory,
    region: &str,
    clock: F,
) -> ReportResult<BackupReport>
where
    F: FnOnce() -> DateTime<Utc>,
{
    if let Some(collection) = Collection::ALL
        .into_iter()
        .find(|c| c.is_required() && inventory.is_absent(*c))
    {
        return Err(ReportError::MissingRequiredData { collection });
    }

    let mut notes: Vec<DataQualityNote> = Vec::new();

    let raw_jobs = inventory.jobs.as_deref().unwrap_or_default();
    let raw_plans = inventory.plans.as_deref().unwrap_or_default();
    let raw_rules = inventory.rules.as_deref().unwrap_or_default();
    let raw_selections = inventory.selections.as_deref().unwrap_or_default();
    let raw_points = inventory.recovery_points.as_deref().unwrap_or_default();
    let raw_protected = inventory.protected_resources.as_deref().unwrap_or_default();

    let (mut plans, unmatched_rule_count) = plans::build_plans(raw_plans, raw_rules, &mut notes);
    let selections = plans::build_selections(raw_selections, &plans, &mut notes);
    plans::attach_selection_counts(&mut plans, &selections);

    let jobs = jobs::normalize_jobs(raw_jobs, &plans, &mut notes);
    let recovery_points = jobs::normalize_recovery_points(raw_points, &mut notes);

    let job_summary = summary::tally(&jobs, raw_jobs.len())?;

    let protected_resources =
        resources::build_resources(&jobs, &recovery_points, raw_protected, &mut notes);
    let coverage_gaps = resources::coverage_gaps(&protected_resources, &selections);
    let monthly_usage = summary::monthly_usage(&jobs);
    let statistics = summary::statistics(
        &jobs,
        &protected_resources,
        &selections,
        unmatched_rule_count,
    );

    let diagnostics = Diagnostics {
        incomplete_collections: incomplete_collections(inventory),
        fetch_warnings: inventory.warnings.clone(),
        notes,
    };

    tracing::info!(
        "Aggregated {} plans, {} selections, {} jobs, {} recovery points into {} resources ({} notes)",
        plans.len(),
        selections.len(),
        jobs.len(),
        recovery_points.len(),
        protected_resources.len(),
        diagnostics.notes.len()
    );

    Ok(BackupReport {
        region: region.to_string(),
        generated_at: clock(),
        lookback_days: inventory.lookback_days,
        plans,
        selections,
        jobs,
        recovery_points,
        protected_resources,
        job_summary,
        statistics,
        coverage_gaps,
        monthly_usage,
        diagnostics,
    })
}

/// Absent collections plus any collection a fetch warning names
fn incomplete_collections(inventory: &RawInventory) -> Vec<Collection> {
    let mut incomplete: BTreeSet<Collection> = Collection::ALL
        .into_iter()
        .filter(|c| inventory.is_absent(*c))
        .collect();
    incomplete.extend(inventory.warnings.iter().map(|w: &FetchWarning| w.collection));
    incomplete.into_iter().collect()
}
