//! Constants used throughout the sync engine
//!
//! This module centralizes magic strings, default values and user-facing
//! banner text to keep them consistent between the engine and the binary.

// Identifiers
/// Reserved prefix marking an id that was generated locally and is unknown to the server
pub const LOCAL_ID_PREFIX: &str = "local-";

// Sync defaults
pub const DEFAULT_AUTO_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 10;
pub const MAX_AUTO_SYNC_INTERVAL_SECS: u64 = 86_400;

// Remote defaults
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_USER_ID: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_API_TOKEN_ENV: &str = "TASKSYNC_API_TOKEN";
pub const PROBE_CONNECT_TIMEOUT_MS: u64 = 2_000;

// Storage
pub const APP_DIR_NAME: &str = "tasksync";
pub const DATABASE_FILE_NAME: &str = "tasks.db";
pub const LOG_FILE_NAME: &str = "tasksync.log";
pub const MAX_IN_MEMORY_LOG_LINES: usize = 500;

// Error Messages
pub const ERROR_TITLE_REQUIRED: &str = "Title is required";
pub const ERROR_OFFLINE: &str = "No network connection";
pub const ERROR_TASK_CREATE_FAILED: &str = "Failed to create task";
pub const ERROR_TASK_UPDATE_FAILED: &str = "Failed to update task";
pub const ERROR_TASK_DELETE_FAILED: &str = "Failed to delete task";
pub const ERROR_REFRESH_FAILED: &str = "Failed to refresh tasks";
pub const ERROR_LOAD_MORE_FAILED: &str = "Failed to load more tasks";
pub const ERROR_SYNC_FAILED: &str = "Failed to sync pending changes";

// Configuration
pub const CONFIG_GENERATED: &str = "Configuration file generated";
pub const CONFIG_FILE_NAME: &str = "tasksync.toml";
