//! CLI argument definitions for Gantry.

use clap::{Parser, Subcommand};

/// Gantry - a construction project activity tracker.
///
/// Start with `gy system init`, then `gy activity create` and `gy tree`.
#[derive(Parser, Debug)]
#[command(name = "gy")]
#[command(author, version, about = "Track construction project activities and schedules", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if gy was started in <path> instead of the current directory.
    /// Can also be set via the GY_PROJECT environment variable.
    #[arg(short = 'C', long = "project", global = true, env = "GY_PROJECT")]
    pub project_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activity management commands
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },

    /// Stage management commands
    Stage {
        #[command(subcommand)]
        command: StageCommands,
    },

    /// Move an activity to a new position (optionally across stages)
    Move {
        /// Activity ID (e.g., act-a1b2)
        id: String,

        /// Destination stage (defaults to the activity's current stage)
        #[arg(short, long)]
        stage: Option<String>,

        /// Destination index within the stage's display order
        #[arg(short, long)]
        index: usize,
    },

    /// Render the activity forest grouped by stage
    Tree {
        /// Limit to a single stage
        #[arg(long)]
        stage: Option<String>,

        /// Sort stage groups in descending label order
        #[arg(long)]
        desc: bool,

        /// Show collapsed branches too
        #[arg(long)]
        all: bool,
    },

    /// Show the action audit trail
    Log {
        /// Only show entries mentioning this activity ID
        id: Option<String>,

        /// Maximum number of entries to show (newest last)
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Activity subcommands
#[derive(Subcommand, Debug)]
pub enum ActivityCommands {
    /// Create a new activity
    Create {
        /// Activity name
        name: String,

        /// Stage label (defaults to the configured default stage)
        #[arg(short, long)]
        stage: Option<String>,

        /// Parent activity ID (child inherits the parent's stage)
        #[arg(short, long)]
        parent: Option<String>,

        /// Detailed description
        #[arg(short, long)]
        description: Option<String>,

        /// Assignee
        #[arg(short, long)]
        assignee: Option<String>,

        /// Planned start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Planned end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Planned duration in days
        #[arg(long)]
        duration: Option<u32>,
    },

    /// List activities
    List {
        /// Filter by stage
        #[arg(long)]
        stage: Option<String>,

        /// Filter by status (not_started, in_progress, completed)
        #[arg(long)]
        status: Option<String>,

        /// Filter by assignee
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Show activity details with display identifier and children
    Show {
        /// Activity ID (e.g., act-a1b2)
        id: String,
    },

    /// Update an activity
    Update {
        /// Activity ID
        id: String,

        /// New name (empty values are ignored)
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New status (not_started, in_progress, completed)
        #[arg(long)]
        status: Option<String>,

        /// Completion percent (0-100)
        #[arg(long)]
        progress: Option<u8>,

        /// New assignee
        #[arg(long)]
        assignee: Option<String>,

        /// Schedule health (unknown, good, at_risk, critical)
        #[arg(long)]
        health: Option<String>,

        /// Tracking against plan (on_track, behind, ahead)
        #[arg(long)]
        progress_status: Option<String>,

        /// Flag or unflag as at risk
        #[arg(long)]
        at_risk: Option<bool>,

        /// Expand or collapse children in tree output
        #[arg(long)]
        expanded: Option<bool>,

        /// Planned start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Planned end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Planned duration in days
        #[arg(long)]
        duration: Option<u32>,
    },

    /// Delete an activity (children are promoted to roots)
    Delete {
        /// Activity ID
        id: String,
    },
}

/// Stage subcommands
#[derive(Subcommand, Debug)]
pub enum StageCommands {
    /// List stage labels with member counts
    List,

    /// Rename a stage across every activity tagged with it
    Rename {
        /// Current stage label
        old: String,

        /// New stage label
        new: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// List all configuration entries
    List,
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize gantry storage for this project
    Init,

    /// Show storage location, counts, and build info
    Info,

    /// Rebuild the query cache from the activity log
    Rebuild,
}
