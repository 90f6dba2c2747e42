//! Data models for Gantry entities.
//!
//! This module defines the core data structures:
//! - `Activity` - Work items grouped by stage, ordered by sparse sort keys
//! - `ActivityStatus` / `Health` / `ProgressStatus` - workflow enums
//! - `StageGroup` - derived grouping of activities sharing a stage label

pub mod tree;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage assigned to activities created without an explicit stage.
pub const DEFAULT_STAGE: &str = "1.0 PLANNING";

/// Activity status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityStatus::NotStarted => "not_started",
            ActivityStatus::InProgress => "in_progress",
            ActivityStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "not_started" | "notstarted" => Ok(ActivityStatus::NotStarted),
            "in_progress" | "inprogress" => Ok(ActivityStatus::InProgress),
            "completed" | "done" => Ok(ActivityStatus::Completed),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Schedule health assessment for an activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    #[default]
    Unknown,
    Good,
    AtRisk,
    Critical,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Health::Unknown => "unknown",
            Health::Good => "good",
            Health::AtRisk => "at_risk",
            Health::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Health {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "unknown" => Ok(Health::Unknown),
            "good" => Ok(Health::Good),
            "at_risk" | "atrisk" => Ok(Health::AtRisk),
            "critical" => Ok(Health::Critical),
            _ => Err(format!("Unknown health: {}", s)),
        }
    }
}

/// Whether the activity is tracking to its planned schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    OnTrack,
    Behind,
    Ahead,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressStatus::OnTrack => "on_track",
            ProgressStatus::Behind => "behind",
            ProgressStatus::Ahead => "ahead",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "on_track" | "ontrack" => Ok(ProgressStatus::OnTrack),
            "behind" => Ok(ProgressStatus::Behind),
            "ahead" => Ok(ProgressStatus::Ahead),
            _ => Err(format!("Unknown progress status: {}", s)),
        }
    }
}

/// A work item tracked by Gantry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier (e.g., "act-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Activity name
    pub name: String,

    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Stage label grouping this activity (e.g., "4.0 PRELIMINARY")
    pub stage: String,

    /// Parent activity ID for hierarchical organization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Depth in the hierarchy (0 for roots)
    #[serde(default)]
    pub level: u32,

    /// Sparse ordering key, scoped to (stage, parent). Absolute values are
    /// arbitrary spacing integers, not sequence numbers.
    #[serde(default)]
    pub sort_key: i64,

    /// Current status
    #[serde(default)]
    pub status: ActivityStatus,

    /// Completion percent (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Assigned user or crew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Planned start date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Planned end date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Planned duration in days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,

    /// Schedule health assessment
    #[serde(default)]
    pub health: Health,

    /// Tracking against plan
    #[serde(default)]
    pub progress_status: ProgressStatus,

    /// Flagged as at risk
    #[serde(default)]
    pub at_risk: bool,

    /// Whether children are shown when rendering the tree
    #[serde(default = "default_expanded")]
    pub is_expanded: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

fn default_expanded() -> bool {
    true
}

impl Activity {
    /// Create a new root-level activity with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_type: "activity".to_string(),
            name,
            description: None,
            stage: DEFAULT_STAGE.to_string(),
            parent: None,
            level: 0,
            sort_key: 0,
            status: ActivityStatus::default(),
            progress: 0,
            assignee: None,
            start_date: None,
            end_date: None,
            duration: None,
            health: Health::default(),
            progress_status: ProgressStatus::default(),
            at_risk: false,
            is_expanded: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sort direction for stage groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageOrder {
    #[default]
    Ascending,
    Descending,
}

/// A derived, non-persisted grouping of activities sharing a stage label.
///
/// Members are sorted by sort key, ties broken by creation timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct StageGroup {
    /// Stage label
    pub stage: String,

    /// Member activities in display order
    pub activities: Vec<Activity>,

    /// Whether the group is expanded in the current view
    pub expanded: bool,
}
