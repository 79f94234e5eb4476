//! tasksync - an offline-first task synchronization engine
//!
//! This library keeps a local, always-available task store in step with a
//! remote REST service under intermittent connectivity. Writes land locally
//! first and are tagged with a synchronization status; a reconciliation pass
//! later drains whatever could not be propagated immediately.
//!
//! # Modules
//!
//! * [`config`] - Configuration loading and validation
//! * [`storage`] - SQLite-backed Local Task Store
//! * [`backend`] - Remote Task Gateway trait and its HTTP implementation
//! * [`connectivity`] - Reachability signal and probe
//! * [`sync`] - The sync engine: optimistic CRUD, reconciliation, paged refresh
//! * [`sync_coordinator`] - Session orchestration and observable state

/// Remote Task Gateway abstraction and HTTP implementation
pub mod backend;

/// Configuration module for managing application settings
pub mod config;

/// Reachability signal consumed by the sync engine
pub mod connectivity;

/// Application constants and default values
pub mod constants;

/// SeaORM entity models for database tables
pub mod entities;

/// Logging setup and in-memory log buffer
pub mod logger;

/// Repository layer for database operations
pub mod repositories;

/// Local storage layer
pub mod storage;

/// Synchronization engine for keeping local and remote data in sync
pub mod sync;

/// Background orchestration of synchronization for a session
pub mod sync_coordinator;

/// Utility functions for timestamps and identifiers
pub mod utils;

// Re-export entity models for convenient access
pub use entities::task;
pub use entities::task::SyncStatus;
