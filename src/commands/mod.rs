//! Command implementations for the Gantry CLI.
//!
//! This module contains the business logic for each CLI command. Every
//! command returns a result struct implementing [`Output`], which the
//! binary renders as JSON (default) or human-readable text (`-H`).

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::tree::{build_forest, display_id, ActivityNode};
use crate::models::{Activity, StageOrder, DEFAULT_STAGE};
use crate::ordering::OrderedCollection;
use crate::reorder::{MoveCommand, MoveOutcome, Slot};
use crate::storage::{
    new_activity_id, parse_health, parse_progress_status, parse_status, validate_activity_id,
    Storage,
};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn open(project_path: &Path) -> Result<Storage> {
    Storage::open(project_path)
}

// === System ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: String,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized gantry storage at {}", self.path)
        } else {
            format!("Gantry storage already exists at {}", self.path)
        }
    }
}

/// Initialize storage for a project.
pub fn system_init(project_path: &Path) -> Result<InitResult> {
    let already = Storage::exists(project_path)?;
    let storage = Storage::init(project_path)?;
    Ok(InitResult {
        initialized: !already,
        path: storage.root.display().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct InfoResult {
    pub path: String,
    pub activities: usize,
    pub stages: usize,
    pub build_timestamp: String,
    pub git_commit: String,
}

impl Output for InfoResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Storage:    {}\nActivities: {}\nStages:     {}\nBuilt:      {} ({})",
            self.path, self.activities, self.stages, self.build_timestamp, self.git_commit
        )
    }
}

/// Show storage location, counts, and build info.
pub fn system_info(project_path: &Path) -> Result<InfoResult> {
    let storage = open(project_path)?;
    Ok(InfoResult {
        path: storage.root.display().to_string(),
        activities: storage.count_activities()?,
        stages: storage.stages()?.len(),
        build_timestamp: env!("GY_BUILD_TIMESTAMP").to_string(),
        git_commit: env!("GY_GIT_COMMIT").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct RebuildResult {
    pub rebuilt: bool,
    pub activities: usize,
}

impl Output for RebuildResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Rebuilt cache: {} activities", self.activities)
    }
}

/// Rebuild the query cache from the activity log.
pub fn system_rebuild(project_path: &Path) -> Result<RebuildResult> {
    let mut storage = open(project_path)?;
    storage.rebuild_cache()?;
    Ok(RebuildResult {
        rebuilt: true,
        activities: storage.count_activities()?,
    })
}

// === Activities ===

#[derive(Debug, Serialize)]
pub struct ActivityResult {
    #[serde(flatten)]
    pub activity: Activity,
    pub display_id: String,
}

impl Output for ActivityResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{} [{}] \"{}\" ({}, {}%)",
            self.activity.id,
            self.display_id,
            self.activity.name,
            self.activity.status,
            self.activity.progress
        )
    }
}

fn with_display_id(storage: &Storage, activity: Activity) -> Result<ActivityResult> {
    let all = storage.list_activities(None, None, None)?;
    let stage = activity.stage.clone();
    let display_id = display_id(&activity, &all, &stage);
    Ok(ActivityResult {
        activity,
        display_id,
    })
}

/// Create a new activity, appended at the end of its stage's order.
#[allow(clippy::too_many_arguments)]
pub fn activity_create(
    project_path: &Path,
    name: String,
    stage: Option<String>,
    parent: Option<String>,
    description: Option<String>,
    assignee: Option<String>,
    start: Option<String>,
    end: Option<String>,
    duration: Option<u32>,
) -> Result<ActivityResult> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Activity name cannot be empty".to_string()));
    }

    let mut storage = open(project_path)?;

    let mut activity = Activity::new(new_activity_id(), name);
    activity.description = description.filter(|s| !s.trim().is_empty());
    activity.assignee = assignee.filter(|s| !s.trim().is_empty());
    activity.start_date = start.map(|s| parse_date(&s)).transpose()?;
    activity.end_date = end.map(|s| parse_date(&s)).transpose()?;
    activity.duration = duration;

    if let Some(parent_id) = parent {
        validate_activity_id(&parent_id)?;
        // Children live in their parent's stage, one level deeper
        let parent_activity = storage.get_activity(&parent_id)?;
        activity.stage = parent_activity.stage;
        activity.level = parent_activity.level + 1;
        activity.parent = Some(parent_id);
    } else {
        activity.stage = match stage.filter(|s| !s.trim().is_empty()) {
            Some(s) => s,
            None => storage
                .get_config("default_stage")?
                .unwrap_or_else(|| DEFAULT_STAGE.to_string()),
        };
    }

    // Append at the end of the stage's sibling order
    let siblings: Vec<(String, i64)> = storage
        .list_stage(&activity.stage)?
        .iter()
        .map(|a| (a.id.clone(), a.sort_key))
        .collect();
    let engine = OrderedCollection::new();
    activity.sort_key = engine.insertion_key(&siblings, siblings.len());

    storage.create_activity(&activity)?;
    with_display_id(&storage, activity)
}

#[derive(Debug, Serialize)]
pub struct ActivityListResult {
    pub count: usize,
    pub activities: Vec<ActivityResult>,
}

impl Output for ActivityListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.activities.is_empty() {
            return "No activities found".to_string();
        }
        let mut lines = Vec::new();
        for entry in &self.activities {
            lines.push(entry.to_human());
        }
        lines.join("\n")
    }
}

/// List activities with optional filters.
pub fn activity_list(
    project_path: &Path,
    stage: Option<String>,
    status: Option<String>,
    assignee: Option<String>,
) -> Result<ActivityListResult> {
    // Validate the status filter up front so typos fail loudly
    let status_filter = status.map(|s| parse_status(&s)).transpose()?;

    let storage = open(project_path)?;
    let all = storage.list_activities(None, None, None)?;
    let activities = storage.list_activities(
        stage.as_deref(),
        status_filter.map(|s| s.to_string()).as_deref(),
        assignee.as_deref(),
    )?;

    let entries: Vec<ActivityResult> = activities
        .into_iter()
        .map(|a| {
            let stage = a.stage.clone();
            let id = display_id(&a, &all, &stage);
            ActivityResult {
                activity: a,
                display_id: id,
            }
        })
        .collect();

    Ok(ActivityListResult {
        count: entries.len(),
        activities: entries,
    })
}

#[derive(Debug, Serialize)]
pub struct ChildSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityShowResult {
    #[serde(flatten)]
    pub activity: Activity,
    pub display_id: String,
    pub children: Vec<ChildSummary>,
}

impl Output for ActivityShowResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "{} [{}] \"{}\"\n  stage:    {}\n  status:   {} ({}%)\n  health:   {} / {}{}",
            self.activity.id,
            self.display_id,
            self.activity.name,
            self.activity.stage,
            self.activity.status,
            self.activity.progress,
            self.activity.health,
            self.activity.progress_status,
            if self.activity.at_risk { " [AT RISK]" } else { "" },
        );
        if let Some(assignee) = &self.activity.assignee {
            out.push_str(&format!("\n  assignee: {}", assignee));
        }
        if let (Some(start), Some(end)) = (self.activity.start_date, self.activity.end_date) {
            out.push_str(&format!("\n  dates:    {} .. {}", start, end));
        }
        if let Some(duration) = self.activity.duration {
            out.push_str(&format!("\n  duration: {} days", duration));
        }
        if let Some(description) = &self.activity.description {
            out.push_str(&format!("\n  notes:    {}", description));
        }
        if !self.children.is_empty() {
            out.push_str("\n  children:");
            for child in &self.children {
                out.push_str(&format!("\n    {} \"{}\"", child.id, child.name));
            }
        }
        out
    }
}

/// Show activity details with display identifier and children.
pub fn activity_show(project_path: &Path, id: &str) -> Result<ActivityShowResult> {
    validate_activity_id(id)?;
    let storage = open(project_path)?;
    let activity = storage.get_activity(id)?;
    let all = storage.list_activities(None, None, None)?;

    let stage = activity.stage.clone();
    let display = display_id(&activity, &all, &stage);
    let children: Vec<ChildSummary> = all
        .iter()
        .filter(|a| a.parent.as_deref() == Some(id))
        .map(|a| ChildSummary {
            id: a.id.clone(),
            name: a.name.clone(),
        })
        .collect();

    Ok(ActivityShowResult {
        activity,
        display_id: display,
        children,
    })
}

/// Field updates for an activity; `None` leaves the field untouched.
#[derive(Debug, Default)]
pub struct ActivityUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub progress: Option<u8>,
    pub assignee: Option<String>,
    pub health: Option<String>,
    pub progress_status: Option<String>,
    pub at_risk: Option<bool>,
    pub expanded: Option<bool>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: Option<u32>,
}

/// Update an activity's fields.
///
/// An empty `name` is silently ignored (the previous value stays), matching
/// the rename-revert behavior of the original system.
pub fn activity_update(
    project_path: &Path,
    id: &str,
    update: ActivityUpdate,
) -> Result<ActivityResult> {
    validate_activity_id(id)?;
    let mut storage = open(project_path)?;
    let mut activity = storage.get_activity(id)?;

    if let Some(name) = update.name {
        if !name.trim().is_empty() {
            activity.name = name;
        }
    }
    if let Some(description) = update.description {
        activity.description = Some(description).filter(|s| !s.trim().is_empty());
    }
    if let Some(status) = update.status {
        activity.status = parse_status(&status)?;
    }
    if let Some(progress) = update.progress {
        if progress > 100 {
            return Err(Error::InvalidInput(format!(
                "Progress must be 0-100, got {}",
                progress
            )));
        }
        activity.progress = progress;
    }
    if let Some(assignee) = update.assignee {
        activity.assignee = Some(assignee).filter(|s| !s.trim().is_empty());
    }
    if let Some(health) = update.health {
        activity.health = parse_health(&health)?;
    }
    if let Some(progress_status) = update.progress_status {
        activity.progress_status = parse_progress_status(&progress_status)?;
    }
    if let Some(at_risk) = update.at_risk {
        activity.at_risk = at_risk;
    }
    if let Some(expanded) = update.expanded {
        activity.is_expanded = expanded;
    }
    if let Some(start) = update.start {
        activity.start_date = Some(parse_date(&start)?);
    }
    if let Some(end) = update.end {
        activity.end_date = Some(parse_date(&end)?);
    }
    if let Some(duration) = update.duration {
        activity.duration = Some(duration);
    }

    activity.updated_at = chrono::Utc::now();
    storage.update_activity(&activity)?;
    with_display_id(&storage, activity)
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub deleted: String,
    pub orphaned_children: usize,
}

impl Output for DeleteResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.orphaned_children > 0 {
            format!(
                "Deleted {} ({} children promoted to roots)",
                self.deleted, self.orphaned_children
            )
        } else {
            format!("Deleted {}", self.deleted)
        }
    }
}

/// Delete an activity. Children keep their parent reference and surface as
/// roots the next time the tree is built.
pub fn activity_delete(project_path: &Path, id: &str) -> Result<DeleteResult> {
    validate_activity_id(id)?;
    let mut storage = open(project_path)?;
    let orphaned_children = storage
        .list_activities(None, None, None)?
        .iter()
        .filter(|a| a.parent.as_deref() == Some(id))
        .count();
    storage.delete_activity(id)?;
    Ok(DeleteResult {
        deleted: id.to_string(),
        orphaned_children,
    })
}

// === Stages ===

#[derive(Debug, Serialize)]
pub struct StageSummary {
    pub stage: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StageListResult {
    pub stages: Vec<StageSummary>,
}

impl Output for StageListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.stages.is_empty() {
            return "No stages found".to_string();
        }
        self.stages
            .iter()
            .map(|s| format!("{} ({} activities)", s.stage, s.count))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List stage labels with member counts.
pub fn stage_list(project_path: &Path) -> Result<StageListResult> {
    let storage = open(project_path)?;
    let mut stages = Vec::new();
    for label in storage.stages()? {
        let count = storage.list_stage(&label)?.len();
        stages.push(StageSummary {
            stage: label,
            count,
        });
    }
    Ok(StageListResult { stages })
}

#[derive(Debug, Serialize)]
pub struct StageRenameResult {
    pub old: String,
    pub new: String,
    pub renamed: usize,
}

impl Output for StageRenameResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Renamed stage \"{}\" to \"{}\" ({} activities)",
            self.old, self.new, self.renamed
        )
    }
}

/// Rename a stage across every activity tagged with it.
pub fn stage_rename(project_path: &Path, old: &str, new: &str) -> Result<StageRenameResult> {
    if new.trim().is_empty() {
        return Err(Error::InvalidInput("Stage name cannot be empty".to_string()));
    }
    let mut storage = open(project_path)?;
    let renamed = storage.rename_stage(old, new)?;
    if renamed == 0 {
        return Err(Error::NotFound(format!("No activities in stage: {}", old)));
    }
    Ok(StageRenameResult {
        old: old.to_string(),
        new: new.to_string(),
        renamed,
    })
}

// === Move ===

#[derive(Debug, Serialize)]
pub struct MoveResult {
    pub id: String,
    #[serde(flatten)]
    pub outcome: MoveOutcome,
}

impl Output for MoveResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if !self.outcome.moved {
            return format!("{} already in place, nothing to do", self.id);
        }
        let mut out = format!(
            "Moved {} (sort key {})",
            self.id,
            self.outcome.new_sort_key.unwrap_or_default()
        );
        if self.outcome.stage_changed {
            out.push_str(", stage reassigned");
        }
        if self.outcome.rebalanced {
            out.push_str(", group rebalanced");
        }
        out
    }
}

/// Move an activity to a new slot, optionally across stages.
pub fn move_activity(
    project_path: &Path,
    id: &str,
    stage: Option<String>,
    index: usize,
) -> Result<MoveResult> {
    validate_activity_id(id)?;
    let mut storage = open(project_path)?;
    let activity = storage.get_activity(id)?;

    let current_index = storage
        .list_stage(&activity.stage)?
        .iter()
        .position(|a| a.id == id)
        .unwrap_or(0);
    let from = Slot::new(activity.stage.clone(), current_index);
    let to = Slot::new(stage.unwrap_or(activity.stage), index);

    let outcome = MoveCommand::new(id, from, to).execute(&mut storage)?;
    Ok(MoveResult {
        id: id.to_string(),
        outcome,
    })
}

// === Tree ===

#[derive(Debug, Serialize)]
pub struct StageTree {
    pub stage: String,
    pub roots: Vec<ActivityNode>,
}

#[derive(Debug, Serialize)]
pub struct TreeResult {
    pub stages: Vec<StageTree>,
}

impl Output for TreeResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.stages.is_empty() {
            return "No activities found".to_string();
        }
        let mut lines = Vec::new();
        for group in &self.stages {
            lines.push(group.stage.clone());
            for root in &group.roots {
                render_node(root, 1, &mut lines);
            }
        }
        lines.join("\n")
    }
}

fn render_node(node: &ActivityNode, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let mut line = format!(
        "{}{} {} \"{}\" ({}, {}%)",
        indent,
        node.display_id,
        node.activity.id,
        node.activity.name,
        node.activity.status,
        node.activity.progress
    );
    if node.orphaned {
        line.push_str(" (orphan)");
    }
    if !node.activity.is_expanded && !node.children.is_empty() {
        line.push_str(" (collapsed)");
    }
    lines.push(line);
    for child in &node.children {
        render_node(child, depth + 1, lines);
    }
}

/// Hide descendants of collapsed nodes unless `show_all` is set.
fn prune_collapsed(mut node: ActivityNode, show_all: bool) -> ActivityNode {
    if !show_all && !node.activity.is_expanded {
        node.children.clear();
    } else {
        node.children = node
            .children
            .into_iter()
            .map(|c| prune_collapsed(c, show_all))
            .collect();
    }
    node
}

/// Render the activity forest grouped by stage.
pub fn tree(
    project_path: &Path,
    stage: Option<String>,
    desc: bool,
    show_all: bool,
) -> Result<TreeResult> {
    let storage = open(project_path)?;
    let all = storage.list_activities(None, None, None)?;

    let order = if desc {
        StageOrder::Descending
    } else {
        StageOrder::Ascending
    };
    // CLI output renders every requested stage group expanded; collapse
    // state applies per activity, not per group.
    let expanded: BTreeSet<String> = storage.stages()?.into_iter().collect();
    let groups = crate::models::tree::group_by_stage(&all, order, &expanded);

    let mut stages = Vec::new();
    for group in groups {
        if let Some(filter) = &stage {
            if &group.stage != filter {
                continue;
            }
        }
        let roots = build_forest(&group.activities)
            .into_iter()
            .map(|n| prune_collapsed(n, show_all))
            .collect();
        stages.push(StageTree {
            stage: group.stage,
            roots,
        });
    }

    Ok(TreeResult { stages })
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct ConfigValueResult {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Output for ConfigValueResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.value {
            Some(value) => format!("{} = {}", self.key, value),
            None => format!("{} is not set", self.key),
        }
    }
}

/// Get a configuration value.
pub fn config_get(project_path: &Path, key: &str) -> Result<ConfigValueResult> {
    let storage = open(project_path)?;
    Ok(ConfigValueResult {
        key: key.to_string(),
        value: storage.get_config(key)?,
    })
}

/// Set a configuration value.
pub fn config_set(project_path: &Path, key: &str, value: &str) -> Result<ConfigValueResult> {
    let mut storage = open(project_path)?;
    storage.set_config(key, value)?;
    Ok(ConfigValueResult {
        key: key.to_string(),
        value: Some(value.to_string()),
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigListResult {
    pub entries: Vec<ConfigValueResult>,
}

impl Output for ConfigListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No configuration set".to_string();
        }
        self.entries
            .iter()
            .map(|e| e.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List all configuration entries.
pub fn config_list(project_path: &Path) -> Result<ConfigListResult> {
    let storage = open(project_path)?;
    let entries = storage
        .list_config()?
        .into_iter()
        .map(|(key, value)| ConfigValueResult {
            key,
            value: Some(value),
        })
        .collect();
    Ok(ConfigListResult { entries })
}

// === Action log ===

#[derive(Debug, Serialize)]
pub struct LogResult {
    pub count: usize,
    pub entries: Vec<crate::action_log::ActionLog>,
}

impl Output for LogResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No logged actions".to_string();
        }
        self.entries
            .iter()
            .map(|e| {
                let status = if e.success { "ok" } else { "failed" };
                format!(
                    "{} {} [{}] {}ms",
                    e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    e.command,
                    status,
                    e.duration_ms
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Show the action audit trail, newest entries last.
pub fn log_show(project_path: &Path, id: Option<String>, limit: usize) -> Result<LogResult> {
    let mut entries = crate::action_log::read_actions(project_path)?;
    if let Some(id) = id {
        entries.retain(|e| e.args.to_string().contains(&id));
    }
    if entries.len() > limit {
        entries.drain(..entries.len() - limit);
    }
    Ok(LogResult {
        count: entries.len(),
        entries,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {}", s)))
}
