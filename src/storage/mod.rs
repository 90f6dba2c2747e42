//! Storage layer for Gantry data.
//!
//! This module handles persistence of activities and configuration.
//!
//! Layout per project, under `~/.local/share/gantry/<project-hash>/`
//! (overridable via the `GY_DATA_DIR` environment variable):
//! - `activities.jsonl` - append-only log of record versions (latest wins)
//! - `cache.db` - SQLite index for filtered and ordered queries
//!
//! Deletes remove the cache row only; the JSONL log is never rewritten.
//! Children of a deleted activity keep their dangling parent reference and
//! surface as roots when the tree is built.

use crate::models::{Activity, ActivityStatus, Health, ProgressStatus};
use crate::{Error, Result};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Storage manager for a single project.
pub struct Storage {
    /// Root directory for this project's data
    pub root: PathBuf,
    /// SQLite connection for indexed queries
    conn: Connection,
}

impl Storage {
    /// Open or create storage for the given project path.
    pub fn open(project_path: &Path) -> Result<Self> {
        let root = get_storage_dir(project_path)?;
        Self::open_at(root)
    }

    /// Open storage rooted under an explicit data directory (DI for tests).
    pub fn open_with_data_dir(project_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = storage_dir_in(data_dir, project_path)?;
        Self::open_at(root)
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        if !root.exists() {
            return Err(Error::NotInitialized);
        }

        let db_path = root.join("cache.db");
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    /// Initialize storage for a new project.
    pub fn init(project_path: &Path) -> Result<Self> {
        let root = get_storage_dir(project_path)?;
        Self::init_at(root)
    }

    /// Initialize storage under an explicit data directory (DI for tests).
    pub fn init_with_data_dir(project_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = storage_dir_in(data_dir, project_path)?;
        Self::init_at(root)
    }

    fn init_at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;

        let log_path = root.join("activities.jsonl");
        if !log_path.exists() {
            File::create(&log_path)?;
        }

        let db_path = root.join("cache.db");
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    /// Check if storage exists for the given project.
    pub fn exists(project_path: &Path) -> Result<bool> {
        let root = get_storage_dir(project_path)?;
        Ok(root.exists() && root.join("cache.db").exists())
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                stage TEXT NOT NULL,
                parent TEXT,
                level INTEGER NOT NULL DEFAULT 0,
                sort_key INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'not_started',
                progress INTEGER NOT NULL DEFAULT 0,
                assignee TEXT,
                start_date TEXT,
                end_date TEXT,
                duration INTEGER,
                health TEXT NOT NULL DEFAULT 'unknown',
                progress_status TEXT NOT NULL DEFAULT 'on_track',
                at_risk INTEGER NOT NULL DEFAULT 0,
                is_expanded INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activities_stage ON activities(stage);
            CREATE INDEX IF NOT EXISTS idx_activities_status ON activities(status);
            CREATE INDEX IF NOT EXISTS idx_activities_parent ON activities(parent);
            CREATE INDEX IF NOT EXISTS idx_activities_stage_order
                ON activities(stage, sort_key, created_at);

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Rebuild the SQLite cache from the JSONL log.
    pub fn rebuild_cache(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM activities", [])?;

        let log_path = self.root.join("activities.jsonl");
        if log_path.exists() {
            let file = File::open(&log_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(activity) = serde_json::from_str::<Activity>(&line) {
                    if activity.entity_type == "activity" {
                        self.cache_activity(&activity)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Cache an activity in SQLite for fast querying.
    fn cache_activity(&self, activity: &Activity) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO activities
            (id, name, description, stage, parent, level, sort_key, status,
             progress, assignee, start_date, end_date, duration, health,
             progress_status, at_risk, is_expanded, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                activity.id,
                activity.name,
                activity.description,
                activity.stage,
                activity.parent,
                activity.level,
                activity.sort_key,
                activity.status.to_string(),
                activity.progress,
                activity.assignee,
                activity.start_date.map(|d| d.to_string()),
                activity.end_date.map(|d| d.to_string()),
                activity.duration,
                activity.health.to_string(),
                activity.progress_status.to_string(),
                activity.at_risk as i64,
                activity.is_expanded as i64,
                activity.created_at.to_rfc3339(),
                activity.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Append an activity version to the JSONL log.
    fn append_log(&self, activity: &Activity) -> Result<()> {
        let log_path = self.root.join("activities.jsonl");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let json = serde_json::to_string(activity)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    // === Activity Operations ===

    /// Create a new activity.
    pub fn create_activity(&mut self, activity: &Activity) -> Result<()> {
        self.append_log(activity)?;
        self.cache_activity(activity)?;
        Ok(())
    }

    /// Get an activity by ID (latest logged version).
    pub fn get_activity(&self, id: &str) -> Result<Activity> {
        // Deleted activities linger in the log; the cache is the source of
        // truth for liveness.
        let live: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM activities WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if !live {
            return Err(Error::NotFound(format!("Activity not found: {}", id)));
        }

        let log_path = self.root.join("activities.jsonl");
        let file = File::open(&log_path)?;
        let reader = BufReader::new(file);

        let mut latest: Option<Activity> = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(activity) = serde_json::from_str::<Activity>(&line) {
                if activity.id == id {
                    latest = Some(activity);
                }
            }
        }

        latest.ok_or_else(|| Error::NotFound(format!("Activity not found: {}", id)))
    }

    /// List all activities, optionally filtered.
    pub fn list_activities(
        &self,
        stage: Option<&str>,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Activity>> {
        let mut sql = String::from("SELECT id FROM activities WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(s) = stage {
            sql.push_str(" AND stage = ?");
            params_vec.push(Box::new(s.to_string()));
        }
        if let Some(s) = status {
            sql.push_str(" AND status = ?");
            params_vec.push(Box::new(s.to_string()));
        }
        if let Some(a) = assignee {
            sql.push_str(" AND assignee = ?");
            params_vec.push(Box::new(a.to_string()));
        }

        sql.push_str(" ORDER BY stage ASC, sort_key ASC, created_at ASC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let ids: Vec<String> = stmt
            .query_map(params_refs.as_slice(), |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut activities = Vec::new();
        for id in ids {
            if let Ok(activity) = self.get_activity(&id) {
                activities.push(activity);
            }
        }

        Ok(activities)
    }

    /// List a stage's members in display order (sort key, then creation).
    pub fn list_stage(&self, stage: &str) -> Result<Vec<Activity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM activities WHERE stage = ?1
             ORDER BY sort_key ASC, created_at ASC",
        )?;
        let ids: Vec<String> = stmt
            .query_map([stage], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut activities = Vec::new();
        for id in ids {
            if let Ok(activity) = self.get_activity(&id) {
                activities.push(activity);
            }
        }

        Ok(activities)
    }

    /// Distinct stage labels in alphabetical order.
    pub fn stages(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT stage FROM activities ORDER BY stage ASC")?;
        let stages: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(stages)
    }

    /// Update an activity.
    pub fn update_activity(&mut self, activity: &Activity) -> Result<()> {
        // Verify the activity exists and is live
        self.get_activity(&activity.id)?;

        self.append_log(activity)?;
        self.cache_activity(activity)?;
        Ok(())
    }

    /// Delete an activity by ID.
    ///
    /// The JSONL log is append-only; only the cache row is removed. Any
    /// children keep their parent reference and are promoted to roots at
    /// tree-build time.
    pub fn delete_activity(&mut self, id: &str) -> Result<()> {
        self.get_activity(id)?;
        self.conn.execute("DELETE FROM activities WHERE id = ?", [id])?;
        Ok(())
    }

    /// Write a new sort key (and optionally stage) for one activity in a
    /// single record update.
    pub fn update_order(
        &mut self,
        id: &str,
        new_stage: Option<&str>,
        sort_key: i64,
    ) -> Result<Activity> {
        let mut activity = self.get_activity(id)?;
        activity.sort_key = sort_key;
        if let Some(stage) = new_stage {
            activity.stage = stage.to_string();
        }
        activity.updated_at = chrono::Utc::now();
        self.update_activity(&activity)?;
        Ok(activity)
    }

    /// Rename a stage: reassign every member of `old` to `new`.
    ///
    /// Updates are sequential per record, not transactional; a failure
    /// partway leaves earlier renames in place.
    pub fn rename_stage(&mut self, old: &str, new: &str) -> Result<usize> {
        let members = self.list_stage(old)?;
        let mut renamed = 0;
        for mut activity in members {
            activity.stage = new.to_string();
            activity.updated_at = chrono::Utc::now();
            self.update_activity(&activity)?;
            renamed += 1;
        }
        Ok(renamed)
    }

    /// Total number of live activities.
    pub fn count_activities(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // === Config Operations ===

    /// Get a configuration value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a configuration value.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// List all configuration entries.
    pub fn list_config(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config ORDER BY key ASC")?;
        let entries: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }
}

/// Get the storage directory for a project.
///
/// Uses a hash of the project path to create a unique directory under
/// `~/.local/share/gantry/`. The `GY_DATA_DIR` environment variable
/// overrides the base directory (used by tests).
pub fn get_storage_dir(project_path: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("GY_DATA_DIR") {
        return storage_dir_in(Path::new(&dir), project_path);
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    storage_dir_in(&data_dir.join("gantry"), project_path)
}

/// Storage directory for a project under an explicit base directory.
fn storage_dir_in(base: &Path, project_path: &Path) -> Result<PathBuf> {
    let canonical = project_path
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize project path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    let short_hash = &hash_hex[..12];

    Ok(base.join(short_hash))
}

/// Generate a unique activity ID.
///
/// Format: `<prefix>-<4 hex chars>`, derived from a random seed plus the
/// current nanosecond timestamp.
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Generate a fresh activity ID with random entropy.
pub fn new_activity_id() -> String {
    generate_id("act", &uuid::Uuid::new_v4().to_string())
}

/// Validate that an ID matches the `act-xxxx` format.
pub fn validate_activity_id(id: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix("act-") else {
        return Err(Error::InvalidId(format!(
            "ID must start with 'act-', got: {}",
            id
        )));
    };

    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}

/// Parse a status string into ActivityStatus.
pub fn parse_status(s: &str) -> Result<ActivityStatus> {
    s.parse().map_err(Error::InvalidInput)
}

/// Parse a health string into Health.
pub fn parse_health(s: &str) -> Result<Health> {
    s.parse().map_err(Error::InvalidInput)
}

/// Parse a progress-status string into ProgressStatus.
pub fn parse_progress_status(s: &str) -> Result<ProgressStatus> {
    s.parse().map_err(Error::InvalidInput)
}
