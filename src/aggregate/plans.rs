//! Plans, rules and selections

use crate::model::{
    BackupPlan, BackupRule, DataQualityNote, Lifecycle, NoteKind, RawPlan, RawRule, RawSelection,
    ResourceSelection, TagCondition,
};
use std::collections::{HashMap, HashSet};

impl From<&RawRule> for BackupRule {
    fn from(raw: &RawRule) -> Self {
        let lifecycle = raw
            .lifecycle
            .as_ref()
            .map(|l| Lifecycle {
                move_to_cold_storage_after_days: l.move_to_cold_storage_after_days,
                delete_after_days: l.delete_after_days,
            })
            .unwrap_or_default();

        Self {
            name: raw.rule_name.clone(),
            rule_id: raw.rule_id.clone(),
            schedule_expression: raw.schedule_expression.clone(),
            target_vault: raw.target_backup_vault_name.clone(),
            start_window_minutes: raw.start_window_minutes,
            completion_window_minutes: raw.completion_window_minutes,
            lifecycle,
            enable_continuous_backup: raw.enable_continuous_backup.unwrap_or(false),
        }
    }
}

/// Build plans in input order with their rules attached.
///
/// Rules whose plan id does not match a listed plan are dropped and noted.
/// Returns the plans and the number of dropped rules.
pub(super) fn build_plans(
    raw_plans: &[RawPlan],
    raw_rules: &[RawRule],
    notes: &mut Vec<DataQualityNote>,
) -> (Vec<BackupPlan>, usize) {
    let known: HashSet<&str> = raw_plans
        .iter()
        .filter_map(|p| p.backup_plan_id.as_deref())
        .filter(|id| !id.is_empty())
        .collect();

    let mut rules_by_plan: HashMap<&str, Vec<BackupRule>> = HashMap::new();
    let mut unmatched = 0;

    for rule in raw_rules {
        match rule.plan_id.as_deref() {
            Some(plan_id) if known.contains(plan_id) => {
                rules_by_plan
                    .entry(plan_id)
                    .or_default()
                    .push(BackupRule::from(rule));
            }
            other => {
                unmatched += 1;
                notes.push(DataQualityNote::new(
                    NoteKind::UnmatchedRule,
                    rule.rule_name.as_deref().unwrap_or("-"),
                    format!(
                        "rule references plan {} which is not in the plan listing; dropped",
                        other.unwrap_or("<none>")
                    ),
                ));
            }
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut plans = Vec::with_capacity(raw_plans.len());

    for raw in raw_plans {
        let id = raw.backup_plan_id.as_deref().unwrap_or_default();

        if id.is_empty() {
            notes.push(DataQualityNote::new(
                NoteKind::MissingIdentifier,
                raw.backup_plan_name.as_deref().unwrap_or("-"),
                "plan has no BackupPlanId; kept without rules",
            ));
        } else if !seen.insert(id) {
            notes.push(DataQualityNote::new(
                NoteKind::DuplicatePlan,
                id,
                "plan listed more than once; later copy ignored",
            ));
            continue;
        }

        plans.push(BackupPlan {
            id: id.to_string(),
            name: raw.backup_plan_name.clone(),
            arn: raw.backup_plan_arn.clone(),
            version_id: raw.version_id.clone(),
            creation_date: raw.creation_date,
            last_execution_date: raw.last_execution_date,
            rules: rules_by_plan.remove(id).unwrap_or_default(),
            selection_count: 0,
            selected_resource_count: 0,
        });
    }

    (plans, unmatched)
}

/// Build selections in input order, resolving each plan back-reference.
///
/// A selection whose plan is missing stays in the output with `orphaned` set.
pub(super) fn build_selections(
    raw_selections: &[RawSelection],
    plans: &[BackupPlan],
    notes: &mut Vec<DataQualityNote>,
) -> Vec<ResourceSelection> {
    let plan_names: HashMap<&str, Option<&str>> = plans
        .iter()
        .filter(|p| !p.id.is_empty())
        .map(|p| (p.id.as_str(), p.name.as_deref()))
        .collect();

    raw_selections
        .iter()
        .map(|raw| {
            let plan_id = raw.plan_id.clone().filter(|id| !id.is_empty());
            let resolved = plan_id.as_deref().and_then(|id| plan_names.get(id));
            let orphaned = resolved.is_none();

            if orphaned {
                notes.push(DataQualityNote::new(
                    NoteKind::OrphanedSelection,
                    raw.selection_name
                        .as_deref()
                        .or(raw.selection_id.as_deref())
                        .unwrap_or("-"),
                    format!(
                        "selection references plan {} which is not in the plan listing",
                        plan_id.as_deref().unwrap_or("<none>")
                    ),
                ));
            }

            ResourceSelection {
                id: raw.selection_id.clone(),
                name: raw.selection_name.clone(),
                plan_name: resolved.and_then(|name| name.map(str::to_string)),
                plan_id,
                orphaned,
                iam_role_arn: raw.iam_role_arn.clone(),
                resources: raw.resources.clone(),
                not_resources: raw.not_resources.clone(),
                tag_conditions: tag_conditions(raw),
            }
        })
        .collect()
}

/// Flatten `ListOfTags` and `Conditions` into one list
fn tag_conditions(raw: &RawSelection) -> Vec<TagCondition> {
    let mut conditions: Vec<TagCondition> = raw
        .list_of_tags
        .iter()
        .filter_map(|tag| {
            Some(TagCondition {
                condition_type: tag
                    .condition_type
                    .clone()
                    .unwrap_or_else(|| "STRINGEQUALS".to_string()),
                key: tag.condition_key.clone()?,
                value: tag.condition_value.clone(),
            })
        })
        .collect();

    if let Some(extra) = &raw.conditions {
        let groups = [
            ("StringEquals", &extra.string_equals),
            ("StringNotEquals", &extra.string_not_equals),
            ("StringLike", &extra.string_like),
            ("StringNotLike", &extra.string_not_like),
        ];
        for (operator, params) in groups {
            conditions.extend(params.iter().filter_map(|p| {
                Some(TagCondition {
                    condition_type: operator.to_string(),
                    key: p.condition_key.clone()?,
                    value: p.condition_value.clone(),
                })
            }));
        }
    }

    conditions
}

/// Fill in per-plan selection and explicit-resource counts
pub(super) fn attach_selection_counts(plans: &mut [BackupPlan], selections: &[ResourceSelection]) {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for selection in selections.iter().filter(|s| !s.orphaned) {
        if let Some(plan_id) = selection.plan_id.as_deref() {
            let entry = counts.entry(plan_id).or_default();
            entry.0 += 1;
            entry.1 += selection.resources.len();
        }
    }

    for plan in plans.iter_mut() {
        if let Some((selection_count, resource_count)) = counts.get(plan.id.as_str()) {
            plan.selection_count = *selection_count;
            plan.selected_resource_count = *resource_count;
        }
    }
}
