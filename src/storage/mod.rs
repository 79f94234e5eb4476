//! Local storage module for task persistence
//!
//! This module provides database operations using SeaORM for:
//! - Opening the SQLite database (file-backed or in-memory)
//! - The observable Local Task Store used by the sync engine

pub mod db;
pub mod tasks;

pub use db::LocalStorage;
pub use tasks::{Change, MergeStats, Modification, TaskStore};
