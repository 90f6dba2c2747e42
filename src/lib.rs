//! Gantry - a construction project activity tracker.
//!
//! This library provides the core functionality for the `gy` CLI tool:
//! stage-grouped hierarchical activities, sparse-integer sibling ordering
//! with corrective rebalancing, and durable local storage.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod models;
pub mod ordering;
pub mod reorder;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use std::sync::OnceLock;
    use tempfile::TempDir;

    use crate::storage::Storage;

    /// Global test data directory for tests that need env var isolation.
    /// This is set once per process and shared by all tests.
    ///
    /// Using `OnceLock` ensures the `TempDir` stays alive for the process
    /// lifetime without requiring `static mut`.
    static TEST_DATA_DIR: OnceLock<TempDir> = OnceLock::new();

    /// Initialize the shared test data directory via GY_DATA_DIR env var.
    ///
    /// This is for tests that call the command layer which doesn't support DI.
    /// Uses `OnceLock` to ensure the env var is set exactly once per process.
    pub fn init_test_env_var() {
        TEST_DATA_DIR.get_or_init(|| {
            let dir = TempDir::new().unwrap();
            // setenv(3) is not thread-safe on POSIX; acceptable in test code
            // because OnceLock ensures this runs exactly once and tests call
            // new_with_env() early in setup. Integration tests use
            // per-subprocess env vars instead.
            std::env::set_var("GY_DATA_DIR", dir.path());
            dir
        });
    }

    /// Test environment with isolated storage using dependency injection.
    ///
    /// For **storage layer tests**: use `TestEnv::new()` + `init_storage()`.
    /// For **command layer tests**: use `TestEnv::new_with_env()` which sets
    /// GY_DATA_DIR.
    pub struct TestEnv {
        /// Simulated project directory
        pub project_dir: TempDir,
        /// Isolated data storage directory (for DI-based tests)
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with isolated directories (pure DI).
        pub fn new() -> Self {
            Self {
                project_dir: TempDir::new().unwrap(),
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Create a new test environment that uses the GY_DATA_DIR env var.
        pub fn new_with_env() -> Self {
            init_test_env_var();
            Self::new()
        }

        /// Get the path to the simulated project.
        pub fn path(&self) -> &Path {
            self.project_dir.path()
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment (DI-based).
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.path(), self.data_path()).unwrap()
        }

        /// Open storage for this test environment (DI-based).
        pub fn open_storage(&self) -> Storage {
            Storage::open_with_data_dir(self.path(), self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Gantry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `gy system init` first")]
    NotInitialized,

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Gantry operations.
pub type Result<T> = std::result::Result<T, Error>;
