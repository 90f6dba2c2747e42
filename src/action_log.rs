//! Action logging for Gantry commands.
//!
//! Every CLI invocation is appended to a structured JSONL log so schedule
//! changes leave an audit trail (who reordered what, when a stage was
//! renamed, which rebalance passes ran).

use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Project path where the command was executed
    pub project_path: String,

    /// Command name (e.g., "activity create", "move", "stage rename")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the project's action log.
///
/// This function never fails hard - it falls back silently on errors to
/// avoid breaking commands due to logging issues.
pub fn log_action(
    project_path: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // Logging can be disabled per project via config
    let enabled = match get_config_bool(project_path, "action_log_enabled") {
        Ok(Some(val)) => val,
        _ => true,
    };
    if !enabled {
        return Ok(());
    }

    let log_path = match get_log_path(project_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Warning: Failed to get action log path: {}", e);
            return Ok(());
        }
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        project_path: project_path.to_string_lossy().to_string(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }

    Ok(())
}

/// Read the action log entries for a project, oldest first.
pub fn read_actions(project_path: &Path) -> crate::Result<Vec<ActionLog>> {
    let log_path = get_log_path(project_path)
        .map_err(|e| crate::Error::Other(format!("Could not resolve action log path: {}", e)))?;
    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path)?;
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<ActionLog>(l).ok())
        .collect())
}

/// Action log lives inside the project's storage directory.
fn get_log_path(project_path: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = crate::storage::get_storage_dir(project_path)?;
    Ok(dir.join("actions.jsonl"))
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Sanitize arguments: redact sensitive keys, shorten paths, cap lengths.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                if key_lower.contains("password")
                    || key_lower.contains("token")
                    || key_lower.contains("secret")
                {
                    sanitized.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
        }
        serde_json::Value::String(s) => {
            if s.len() > 200 {
                // Back off to a char boundary so multibyte input never splits
                let mut cut = 197;
                while !s.is_char_boundary(cut) {
                    cut -= 1;
                }
                serde_json::Value::String(format!("{}... ({} chars)", &s[..cut], s.len()))
            } else {
                serde_json::Value::String(s.clone())
            }
        }
        _ => args.clone(),
    }
}

/// Get a boolean configuration value.
fn get_config_bool(
    project_path: &Path,
    key: &str,
) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    let storage = Storage::open(project_path)?;
    if let Some(value_str) = storage.get_config(key)? {
        let parsed = value_str.to_lowercase();
        Ok(Some(parsed == "true" || parsed == "1" || parsed == "yes"))
    } else {
        Ok(None)
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_simple_string() {
        let value = serde_json::json!("pour footings");
        assert_eq!(sanitize_args(&value), serde_json::json!("pour footings"));
    }

    #[test]
    fn test_sanitize_sensitive_keys() {
        let value = serde_json::json!({
            "assignee": "alice",
            "api_token": "abc123",
            "name": "Excavate"
        });
        let sanitized = sanitize_args(&value);

        assert_eq!(sanitized["assignee"], "alice");
        assert_eq!(sanitized["api_token"], "[REDACTED]");
        assert_eq!(sanitized["name"], "Excavate");
    }

    #[test]
    fn test_sanitize_long_string() {
        let long = "a".repeat(250);
        let value = serde_json::json!(long);
        if let serde_json::Value::String(s) = sanitize_args(&value) {
            assert!(s.contains("... (250 chars)"));
        } else {
            panic!("Expected string value");
        }
    }

    #[test]
    fn test_sanitize_long_multibyte_string() {
        // Byte 197 lands inside a two-byte char; truncation must not panic
        let long = format!("a{}", "é".repeat(150));
        let value = serde_json::json!(long);
        if let serde_json::Value::String(s) = sanitize_args(&value) {
            assert!(s.contains(&format!("... ({} chars)", long.len())));
            assert!(s.starts_with("aé"));
        } else {
            panic!("Expected string value");
        }
    }

    #[test]
    fn test_sanitize_nested_object() {
        let value = serde_json::json!({
            "move": {
                "id": "act-a1b2",
                "secret_key": "hidden"
            }
        });
        let sanitized = sanitize_args(&value);
        assert_eq!(sanitized["move"]["id"], "act-a1b2");
        assert_eq!(sanitized["move"]["secret_key"], "[REDACTED]");
    }
}
