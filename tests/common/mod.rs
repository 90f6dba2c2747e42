//! Common test utilities for gantry integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/gantry/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `project_dir`: Acts as the project root
/// - `data_dir`: Holds gantry's data (via `GY_DATA_DIR` env var)
///
/// The `gy()` method returns a `Command` that automatically sets `GY_DATA_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub project_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize gantry.
    pub fn init() -> Self {
        let env = Self::new();
        env.gy().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the gy binary with isolated data directory.
    ///
    /// Sets `GY_DATA_DIR` per-command for parallel safety.
    pub fn gy(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gy"));
        cmd.current_dir(self.project_dir.path());
        cmd.env("GY_DATA_DIR", self.data_dir.path());
        cmd
    }

    /// Get the path to the project directory.
    pub fn path(&self) -> &std::path::Path {
        self.project_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Create an activity and return its id, optionally in a given stage.
    pub fn create_activity(&self, name: &str, stage: Option<&str>) -> String {
        let mut cmd = self.gy();
        cmd.args(["activity", "create", name]);
        if let Some(stage) = stage {
            cmd.args(["-s", stage]);
        }
        let output = cmd.assert().success().get_output().stdout.clone();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        value["id"].as_str().unwrap().to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
