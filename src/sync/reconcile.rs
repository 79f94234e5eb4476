use log::{debug, info, warn};

use crate::backend::{CreateTaskArgs, GatewayError, UpdateTaskArgs};
use crate::entities::task::{self, SyncStatus};
use crate::sync::{SyncError, SyncGuard, SyncService};

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records that reached `SYNCED` (or were purged) in this pass
    pub synced: usize,
    /// Records whose remote call failed; they stay pending
    pub failed: usize,
}

/// Result of asking for a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Another pass held the guard; nothing was done
    AlreadyRunning,
    Completed(ReconcileReport),
}

impl ReconcileOutcome {
    /// Number of records synced by this call (0 when it did not run).
    pub fn synced(&self) -> usize {
        match self {
            ReconcileOutcome::AlreadyRunning => 0,
            ReconcileOutcome::Completed(report) => report.synced,
        }
    }
}

impl SyncService {
    /// Drains pending records against the remote API.
    ///
    /// Each pending record is handled independently; a failed remote call
    /// leaves that record untouched for the next pass and does not stop the
    /// others. At most one pass runs at a time: a call made while another is
    /// running returns [`ReconcileOutcome::AlreadyRunning`] immediately.
    ///
    /// # Errors
    /// Returns `SyncError::Offline` without touching anything when offline,
    /// and `SyncError::Storage` if local storage fails
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, SyncError> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }

        let Some(_guard) = SyncGuard::try_acquire(&self.sync_in_progress) else {
            debug!("Reconciliation already in progress, skipping");
            return Ok(ReconcileOutcome::AlreadyRunning);
        };

        let pending = self.store.get_pending().await?;
        if pending.is_empty() {
            return Ok(ReconcileOutcome::Completed(ReconcileReport::default()));
        }
        info!("🔄 Reconciling {} pending task(s)...", pending.len());

        let mut report = ReconcileReport::default();
        for task in &pending {
            match self.reconcile_one(task).await {
                Ok(true) => report.synced += 1,
                Ok(false) => debug!("Task {} changed locally during reconciliation", task.id),
                Err(SyncError::Storage(e)) => return Err(SyncError::Storage(e)),
                Err(e) => {
                    warn!("❌ Could not sync task {} ({:?}): {e}", task.id, task.sync_status);
                    report.failed += 1;
                }
            }
        }

        info!(
            "✅ Reconciliation finished: {} synced, {} still pending",
            report.synced, report.failed
        );
        Ok(ReconcileOutcome::Completed(report))
    }

    /// Push one pending record. `Ok(false)` means the remote call succeeded
    /// but a newer local change keeps the record pending.
    async fn reconcile_one(&self, task: &task::Model) -> Result<bool, SyncError> {
        match task.sync_status {
            SyncStatus::PendingCreate => {
                let remote = self.gateway.create_task(CreateTaskArgs::from(task)).await?;
                let status = self.store.promote_created(task, remote.into_local()).await?;
                Ok(status == SyncStatus::Synced)
            }
            SyncStatus::PendingUpdate => {
                self.gateway.update_task(&task.id, UpdateTaskArgs::from(task)).await?;
                self.mark_synced(task).await
            }
            SyncStatus::PendingDelete => {
                match self.gateway.delete_task(&task.id).await {
                    Ok(()) | Err(GatewayError::NotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
                self.purge_deleted(&task.id).await
            }
            SyncStatus::Synced => Ok(false),
        }
    }
}
