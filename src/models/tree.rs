//! Hierarchical activity tree construction and display identifiers.
//!
//! Activities arrive as a flat list tagged with `parent` references. This
//! module builds the parent-linked forest for rendering, partitions
//! activities into stage groups, and derives each node's dotted display
//! identifier from its ancestry and sibling position.
//!
//! Structural anomalies are tolerated, not rejected: an activity whose
//! parent does not resolve is promoted to a root, and parent cycles are
//! broken with a visited-set guard rather than recursing forever.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{Activity, StageGroup, StageOrder};

/// A node in the rendered activity forest.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityNode {
    /// The underlying activity
    #[serde(flatten)]
    pub activity: Activity,

    /// Derived dotted display identifier (never persisted)
    pub display_id: String,

    /// True when this node was promoted to root because its parent
    /// reference did not resolve
    pub orphaned: bool,

    /// Child nodes, sorted by sort key (ties by creation time)
    pub children: Vec<ActivityNode>,
}

/// Build a parent-linked forest from a flat activity list.
///
/// Roots are activities with no parent, a dangling parent, or a parent
/// chain that cycles. Children are sorted by sort key, ties broken by
/// creation timestamp.
pub fn build_forest(activities: &[Activity]) -> Vec<ActivityNode> {
    let by_id: HashMap<&str, &Activity> =
        activities.iter().map(|a| (a.id.as_str(), a)).collect();

    // An activity is attached under its parent only when the parent
    // resolves and the chain above it reaches a root. Cycle members are
    // promoted to roots so every activity appears exactly once.
    let mut promoted: HashSet<&str> = HashSet::new();
    for activity in activities {
        if parent_chain_cycles(activity, &by_id) {
            promoted.insert(activity.id.as_str());
        }
    }

    let mut children_of: HashMap<&str, Vec<&Activity>> = HashMap::new();
    let mut roots: Vec<&Activity> = Vec::new();
    for activity in activities {
        let resolved_parent = activity
            .parent
            .as_deref()
            .filter(|_| !promoted.contains(activity.id.as_str()))
            .and_then(|pid| by_id.get(pid).copied());
        match resolved_parent {
            Some(parent) => children_of
                .entry(parent.id.as_str())
                .or_default()
                .push(activity),
            None => roots.push(activity),
        }
    }

    sort_siblings(&mut roots);
    roots
        .into_iter()
        .map(|a| build_node(a, activities, &children_of))
        .collect()
}

fn build_node(
    activity: &Activity,
    all: &[Activity],
    children_of: &HashMap<&str, Vec<&Activity>>,
) -> ActivityNode {
    let mut child_refs = children_of
        .get(activity.id.as_str())
        .cloned()
        .unwrap_or_default();
    sort_siblings(&mut child_refs);

    let orphaned = match activity.parent.as_deref() {
        Some(pid) => !all.iter().any(|a| a.id == pid),
        None => false,
    };

    ActivityNode {
        activity: activity.clone(),
        display_id: display_id(activity, all, &activity.stage),
        orphaned,
        children: child_refs
            .into_iter()
            .map(|c| build_node(c, all, children_of))
            .collect(),
    }
}

/// Order siblings by sort key, ties by creation time, then id.
fn sort_siblings(siblings: &mut [&Activity]) {
    siblings.sort_by(|a, b| {
        a.sort_key
            .cmp(&b.sort_key)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Walk the parent chain and report whether it revisits a node.
fn parent_chain_cycles(activity: &Activity, by_id: &HashMap<&str, &Activity>) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(activity.id.as_str());
    let mut current = activity;
    while let Some(pid) = current.parent.as_deref() {
        match by_id.get(pid) {
            Some(parent) => {
                if !visited.insert(parent.id.as_str()) {
                    return true;
                }
                current = parent;
            }
            // Dangling parent: chain ends, no cycle
            None => return false,
        }
    }
    false
}

/// Compute the derived display identifier for an activity.
///
/// Pure function of the current tree shape: the stage's leading integer,
/// then the 1-based position among same-parent same-level siblings
/// (ordered by creation time) at each ancestry step, joined with dots.
/// Orphans and cycle members fall back to the root form.
pub fn display_id(activity: &Activity, all: &[Activity], stage: &str) -> String {
    let mut visited = HashSet::new();
    display_id_guarded(activity, all, stage, &mut visited)
}

fn display_id_guarded<'a>(
    activity: &'a Activity,
    all: &'a [Activity],
    stage: &str,
    visited: &mut HashSet<&'a str>,
) -> String {
    visited.insert(activity.id.as_str());

    let parent = activity
        .parent
        .as_deref()
        .and_then(|pid| all.iter().find(|a| a.id == pid));

    match parent {
        Some(p) if !visited.contains(p.id.as_str()) => {
            let parent_id = display_id_guarded(p, all, stage, visited);
            format!("{}.{}", parent_id, sibling_position(activity, all))
        }
        // No parent, dangling parent, or a cycle: root form
        _ => format!(
            "{}.{}",
            stage_leading_number(stage),
            sibling_position(activity, all)
        ),
    }
}

/// 1-based position among same-stage, same-parent, same-level siblings,
/// ordered by creation time (ties by id for determinism).
fn sibling_position(activity: &Activity, all: &[Activity]) -> usize {
    let mut siblings: Vec<&Activity> = all
        .iter()
        .filter(|a| {
            a.stage == activity.stage && a.parent == activity.parent && a.level == activity.level
        })
        .collect();
    siblings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    siblings
        .iter()
        .position(|a| a.id == activity.id)
        .map(|i| i + 1)
        .unwrap_or(1)
}

/// Leading integer of a stage label ("4.0 PRELIMINARY" -> "4").
/// Labels without a leading digit map to "0".
pub fn stage_leading_number(stage: &str) -> String {
    let digits: String = stage.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        "0".to_string()
    } else {
        digits
    }
}

/// Partition activities into stage groups.
///
/// Members are sorted by sort key (ties by creation time); groups sort
/// alphabetically by label in the requested direction. `expanded_stages`
/// is caller-held view state, materialized onto each group.
pub fn group_by_stage(
    activities: &[Activity],
    order: StageOrder,
    expanded_stages: &BTreeSet<String>,
) -> Vec<StageGroup> {
    let mut by_stage: HashMap<&str, Vec<&Activity>> = HashMap::new();
    for activity in activities {
        by_stage.entry(activity.stage.as_str()).or_default().push(activity);
    }

    let mut labels: Vec<&str> = by_stage.keys().copied().collect();
    labels.sort();
    if order == StageOrder::Descending {
        labels.reverse();
    }

    labels
        .into_iter()
        .map(|label| {
            let mut members = by_stage.remove(label).unwrap_or_default();
            sort_siblings(&mut members);
            StageGroup {
                stage: label.to_string(),
                activities: members.into_iter().cloned().collect(),
                expanded: expanded_stages.contains(label),
            }
        })
        .collect()
}
