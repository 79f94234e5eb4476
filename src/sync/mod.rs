//! Synchronization service module.
//!
//! This module provides the [`SyncService`] struct which keeps the Local Task
//! Store and the remote task API in step under intermittent connectivity:
//! - Optimistic local writes for create, update, delete and toggle
//! - Immediate remote propagation when online, demotion to a pending status
//!   when offline or when the remote call fails
//! - A reconciliation pass that drains pending records
//! - Paged refresh that merges server data without clobbering local edits

pub mod reconcile;
pub mod refresh;
pub mod tasks;

use sea_orm::DbErr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{GatewayError, TaskGateway};
use crate::connectivity::Connectivity;
use crate::storage::TaskStore;

pub use reconcile::{ReconcileOutcome, ReconcileReport};
pub use refresh::PaginationState;

/// Errors surfaced by sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A required field is blank. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation needs connectivity and none is available.
    #[error("Offline: no network connection")]
    Offline,

    #[error("Task not found: {0}")]
    NotFound(String),

    /// A remote call failed while connectivity was believed to be up.
    #[error("Remote failure: {0}")]
    Remote(#[from] GatewayError),

    /// Local storage failed; the only unrecoverable class.
    #[error("Storage failure: {0}")]
    Storage(#[from] DbErr),
}

impl SyncError {
    pub fn is_offline(&self) -> bool {
        matches!(self, SyncError::Offline)
    }

    /// Whether trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Offline | SyncError::Remote(_))
    }
}

/// Service that keeps local storage and the remote API in sync.
///
/// Cloning is cheap; clones share the store, the gateway and the
/// reconciliation guard.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<TaskStore>,
    gateway: Arc<dyn TaskGateway>,
    connectivity: Connectivity,
    page_size: u64,
    sync_in_progress: Arc<AtomicBool>,
}

/// Holds the reconciliation guard; releases it when dropped, including when
/// the owning future is cancelled.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncService {
    /// Creates a new `SyncService`.
    ///
    /// # Arguments
    /// * `store` - Shared Local Task Store
    /// * `gateway` - Remote task gateway
    /// * `connectivity` - Reachability signal used to gate remote calls
    /// * `page_size` - Number of tasks requested per page on refresh
    pub fn new(
        store: Arc<TaskStore>,
        gateway: Arc<dyn TaskGateway>,
        connectivity: Connectivity,
        page_size: u64,
    ) -> Self {
        Self {
            store,
            gateway,
            connectivity,
            page_size,
            sync_in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Checks if a reconciliation pass is currently running.
    pub fn is_syncing(&self) -> bool {
        self.sync_in_progress.load(Ordering::Acquire)
    }

    fn is_online(&self) -> bool {
        self.connectivity.is_connected_now()
    }
}
