use log::{debug, info, warn};

use crate::backend::{CreateTaskArgs, GatewayError, UpdateTaskArgs};
use crate::constants::ERROR_TITLE_REQUIRED;
use crate::entities::task::{self, SyncStatus};
use crate::storage::Change;
use crate::sync::{SyncError, SyncService};
use crate::utils::{datetime, ids};

impl SyncService {
    /// All tasks from local storage, most recently created first.
    pub async fn get_all_tasks(&self) -> Result<Vec<task::Model>, SyncError> {
        Ok(self.store.get_all().await?)
    }

    /// A single task from local storage.
    pub async fn get_task_by_id(&self, id: &str) -> Result<Option<task::Model>, SyncError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Creates a new task.
    ///
    /// When online the task is created remotely first and stored with its
    /// server id as `SYNCED`. When offline, or when the remote call fails, it
    /// is stored under a temporary id as `PENDING_CREATE`. Once the title
    /// passes validation a task is always returned.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for a blank title and
    /// `SyncError::Storage` if the local write fails
    pub async fn create_task(&self, title: &str, description: &str) -> Result<task::Model, SyncError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::Validation(ERROR_TITLE_REQUIRED.to_string()));
        }

        let now = datetime::now_millis();
        let local = task::Model {
            id: ids::temporary_id(now),
            title: title.to_string(),
            description: description.to_string(),
            is_completed: false,
            sync_status: SyncStatus::PendingCreate,
            created_at: now,
            updated_at: now,
        };

        if self.is_online() {
            match self.gateway.create_task(CreateTaskArgs::from(&local)).await {
                Ok(remote) => {
                    let synced = remote.into_local();
                    self.store.upsert(&synced).await?;
                    info!("Created task {} remotely", synced.id);
                    return Ok(synced);
                }
                Err(e) => warn!("Remote create failed, keeping task as pending create: {e}"),
            }
        }

        self.store.upsert(&local).await?;
        info!(
            "Stored task {} as pending create at {}",
            local.id,
            datetime::format_millis(local.created_at)
        );
        Ok(local)
    }

    /// Applies an edit to a stored task.
    ///
    /// The write always lands locally first. A task that was never created
    /// remotely stays `PENDING_CREATE`. A task that was `SYNCED` is pushed
    /// immediately when online and retagged `SYNCED` on success; every other
    /// case leaves it `PENDING_UPDATE`.
    ///
    /// # Errors
    /// Returns `SyncError::Validation` for a blank title, `SyncError::NotFound`
    /// if no task has that id or it is awaiting deletion, and
    /// `SyncError::Storage` on local failures
    pub async fn update_task(&self, task: &task::Model) -> Result<task::Model, SyncError> {
        if task.title.trim().is_empty() {
            return Err(SyncError::Validation(ERROR_TITLE_REQUIRED.to_string()));
        }

        let mut written: Option<task::Model> = None;
        let modification = self
            .store
            .modify(&task.id, |existing| {
                // A pending delete is final; edits must not revive it.
                if existing.sync_status == SyncStatus::PendingDelete {
                    return Change::Keep;
                }
                let never_created = existing.sync_status == SyncStatus::PendingCreate
                    || task.sync_status == SyncStatus::PendingCreate;
                let next = task::Model {
                    sync_status: if never_created {
                        SyncStatus::PendingCreate
                    } else {
                        SyncStatus::PendingUpdate
                    },
                    created_at: existing.created_at,
                    updated_at: task.updated_at.max(existing.created_at),
                    ..task.clone()
                };
                written = Some(next.clone());
                Change::Put(next)
            })
            .await?
            .ok_or_else(|| SyncError::NotFound(task.id.clone()))?;
        let stored = written.ok_or_else(|| SyncError::NotFound(task.id.clone()))?;

        if stored.sync_status == SyncStatus::PendingCreate {
            debug!("Task {} not created remotely yet, edit stays local", stored.id);
            return Ok(stored);
        }
        if modification.previous.sync_status != SyncStatus::Synced || !self.is_online() {
            return Ok(stored);
        }

        match self.gateway.update_task(&stored.id, UpdateTaskArgs::from(&stored)).await {
            Ok(_) => {
                if self.mark_synced(&stored).await? {
                    info!("Updated task {} remotely", stored.id);
                    return Ok(stored.with_status(SyncStatus::Synced));
                }
                Ok(stored)
            }
            Err(e) => {
                warn!("Remote update of task {} failed, keeping it pending: {e}", stored.id);
                Ok(stored)
            }
        }
    }

    /// Flips completion and bumps `updated_at`, then applies it like [`update_task`](Self::update_task).
    pub async fn toggle_completion(&self, task: &task::Model) -> Result<task::Model, SyncError> {
        let toggled = task::Model {
            is_completed: !task.is_completed,
            updated_at: datetime::now_millis().max(task.created_at),
            ..task.clone()
        };
        self.update_task(&toggled).await
    }

    /// Deletes a task.
    ///
    /// A `PENDING_CREATE` task is purged without any remote call. Otherwise
    /// the task is tagged `PENDING_DELETE`, and purged once the remote delete
    /// succeeds; when offline or on failure the tagged row is kept for retry.
    ///
    /// # Errors
    /// Returns `SyncError::NotFound` if no task has that id and
    /// `SyncError::Storage` on local failures
    pub async fn delete_task(&self, id: &str) -> Result<(), SyncError> {
        let modification = self
            .store
            .modify(id, |existing| {
                if existing.sync_status == SyncStatus::PendingCreate {
                    Change::Remove
                } else {
                    Change::Put(existing.with_status(SyncStatus::PendingDelete))
                }
            })
            .await?
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;

        if modification.previous.sync_status == SyncStatus::PendingCreate {
            info!("Purged local-only task {id}");
            return Ok(());
        }
        if !self.is_online() {
            return Ok(());
        }

        match self.gateway.delete_task(id).await {
            Ok(()) | Err(GatewayError::NotFound(_)) => {
                self.purge_deleted(id).await?;
                info!("Deleted task {id} remotely");
            }
            Err(e) => warn!("Remote delete of task {id} failed, keeping it pending: {e}"),
        }
        Ok(())
    }

    /// Retag `SYNCED` only if the row still holds exactly what was pushed.
    pub(super) async fn mark_synced(&self, pushed: &task::Model) -> Result<bool, SyncError> {
        let expected = pushed.with_status(SyncStatus::Synced);
        let modification = self
            .store
            .modify(&pushed.id, |current| {
                if current.sync_status == SyncStatus::PendingUpdate && current.with_status(SyncStatus::Synced) == expected {
                    Change::Put(expected.clone())
                } else {
                    Change::Keep
                }
            })
            .await?;
        Ok(modification.is_some_and(|m| m.changed))
    }

    /// Purge a row whose remote delete went through, unless it was revived meanwhile.
    pub(super) async fn purge_deleted(&self, id: &str) -> Result<bool, SyncError> {
        let modification = self
            .store
            .modify(id, |current| {
                if current.sync_status == SyncStatus::PendingDelete {
                    Change::Remove
                } else {
                    Change::Keep
                }
            })
            .await?;
        Ok(modification.is_some_and(|m| m.changed))
    }
}
