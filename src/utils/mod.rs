//! Utility modules for the sync engine.
//!
//! - [`datetime`] - Epoch-millisecond clock helpers
//! - [`ids`] - Temporary identifier generation

pub mod datetime;
pub mod ids;
