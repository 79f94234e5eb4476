//! Local Task Store: the single source of truth for task reads.
//!
//! Every committed write republishes a full snapshot of the table and the
//! pending count to all observers, before the caller regains control.

use log::debug;
use sea_orm::{DbErr, TransactionTrait};
use std::collections::HashSet;
use tokio::sync::{watch, Mutex};

use super::db::LocalStorage;
use crate::entities::task::{self, SyncStatus};
use crate::repositories::TaskRepository;

/// What a read-modify-write closure wants done with the current row.
#[derive(Debug, Clone)]
pub enum Change {
    /// Write this record (same id) in place of the current one
    Put(task::Model),
    /// Purge the row
    Remove,
    /// Leave the row untouched
    Keep,
}

/// Result of [`TaskStore::modify`] on an existing row.
#[derive(Debug, Clone)]
pub struct Modification {
    pub previous: task::Model,
    pub changed: bool,
}

/// Counters reported by a page merge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub upserted: usize,
    pub kept_local: usize,
    pub pruned: u64,
}

/// Durable, observable task table.
///
/// Physical writes are serialized through an async mutex; reads go straight
/// to the connection and never wait on writers.
pub struct TaskStore {
    storage: LocalStorage,
    write_lock: Mutex<()>,
    tasks_tx: watch::Sender<Vec<task::Model>>,
    pending_tx: watch::Sender<u64>,
}

impl TaskStore {
    /// Wrap opened storage and load the initial snapshot.
    pub async fn new(storage: LocalStorage) -> Result<Self, DbErr> {
        let tasks = TaskRepository::get_all(&storage.conn).await?;
        let pending = TaskRepository::count_pending(&storage.conn).await?;
        let (tasks_tx, _) = watch::channel(tasks);
        let (pending_tx, _) = watch::channel(pending);

        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
            tasks_tx,
            pending_tx,
        })
    }

    /// Live view of all tasks, most recently created first.
    pub fn observe_all(&self) -> watch::Receiver<Vec<task::Model>> {
        self.tasks_tx.subscribe()
    }

    /// Live count of tasks whose status is not `SYNCED`.
    pub fn observe_pending_count(&self) -> watch::Receiver<u64> {
        self.pending_tx.subscribe()
    }

    /// Last published snapshot.
    pub fn snapshot(&self) -> Vec<task::Model> {
        self.tasks_tx.borrow().clone()
    }

    /// Last published pending count.
    pub fn pending_count(&self) -> u64 {
        *self.pending_tx.borrow()
    }

    pub async fn get_all(&self) -> Result<Vec<task::Model>, DbErr> {
        TaskRepository::get_all(&self.storage.conn).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<task::Model>, DbErr> {
        TaskRepository::get_by_id(&self.storage.conn, id).await
    }

    pub async fn get_pending(&self) -> Result<Vec<task::Model>, DbErr> {
        TaskRepository::get_pending(&self.storage.conn).await
    }

    pub async fn count_pending(&self) -> Result<u64, DbErr> {
        TaskRepository::count_pending(&self.storage.conn).await
    }

    /// Insert or overwrite a task by id.
    pub async fn upsert(&self, task: &task::Model) -> Result<(), DbErr> {
        let _guard = self.write_lock.lock().await;
        TaskRepository::upsert(&self.storage.conn, task).await?;
        self.publish().await
    }

    /// Purge a task. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, DbErr> {
        let _guard = self.write_lock.lock().await;
        let removed = TaskRepository::delete_by_id(&self.storage.conn, id).await?;
        if removed {
            self.publish().await?;
        }
        Ok(removed)
    }

    /// Atomically read a row and replace or purge it based on its current value.
    ///
    /// Returns `None` when no row has that id. The closure runs while the
    /// write lock is held, so no other write can slip between read and write.
    pub async fn modify<F>(&self, id: &str, decide: F) -> Result<Option<Modification>, DbErr>
    where
        F: FnOnce(&task::Model) -> Change,
    {
        let _guard = self.write_lock.lock().await;
        let txn = self.storage.conn.begin().await?;

        let Some(previous) = TaskRepository::get_by_id(&txn, id).await? else {
            return Ok(None);
        };

        let changed = match decide(&previous) {
            Change::Put(next) => {
                TaskRepository::upsert(&txn, &next).await?;
                true
            }
            Change::Remove => TaskRepository::delete_by_id(&txn, id).await?,
            Change::Keep => false,
        };
        txn.commit().await?;

        if changed {
            self.publish().await?;
        }
        Ok(Some(Modification { previous, changed }))
    }

    /// Replace a `PENDING_CREATE` row with the record the server created for it.
    ///
    /// `sent` is the local row the create request was built from. The server
    /// record lands as `SYNCED` when the local row still equals `sent`, as
    /// `PENDING_UPDATE` carrying the local fields when it was edited
    /// meanwhile, and as `PENDING_DELETE` when it was cancelled meanwhile.
    /// Returns the status the server record was stored with.
    pub async fn promote_created(&self, sent: &task::Model, server: task::Model) -> Result<SyncStatus, DbErr> {
        let _guard = self.write_lock.lock().await;
        let txn = self.storage.conn.begin().await?;
        let local_id = sent.id.as_str();

        let stored = match TaskRepository::get_by_id(&txn, local_id).await? {
            None => server.with_status(SyncStatus::PendingDelete),
            Some(local) if local == *sent => server.with_status(SyncStatus::Synced),
            Some(local) => task::Model {
                id: server.id.clone(),
                title: local.title,
                description: local.description,
                is_completed: local.is_completed,
                sync_status: SyncStatus::PendingUpdate,
                created_at: server.created_at.min(local.updated_at),
                updated_at: local.updated_at,
            },
        };

        TaskRepository::delete_by_id(&txn, local_id).await?;
        TaskRepository::upsert(&txn, &stored).await?;
        txn.commit().await?;

        debug!("Promoted {} to {} as {:?}", local_id, stored.id, stored.sync_status);
        self.publish().await?;
        Ok(stored.sync_status)
    }

    /// Merge a page of server records.
    ///
    /// A server record never overwrites a local row that is not `SYNCED`.
    /// With `prune`, synced rows absent from the page are purged; pending
    /// rows are never pruned.
    pub async fn merge_page(&self, remote: &[task::Model], prune: bool) -> Result<MergeStats, DbErr> {
        let _guard = self.write_lock.lock().await;
        let txn = self.storage.conn.begin().await?;
        let mut stats = MergeStats::default();

        if prune {
            let keep: Vec<String> = remote.iter().map(|t| t.id.clone()).collect();
            stats.pruned = TaskRepository::delete_synced_except(&txn, &keep).await?;
        }

        let pending_ids: HashSet<String> = TaskRepository::get_pending(&txn)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        for server_task in remote {
            if pending_ids.contains(&server_task.id) {
                stats.kept_local += 1;
                continue;
            }
            TaskRepository::upsert(&txn, &server_task.with_status(SyncStatus::Synced)).await?;
            stats.upserted += 1;
        }

        txn.commit().await?;
        self.publish().await?;
        Ok(stats)
    }

    /// Push the current table state to observers.
    async fn publish(&self) -> Result<(), DbErr> {
        let tasks = TaskRepository::get_all(&self.storage.conn).await?;
        let pending = tasks.iter().filter(|t| t.is_pending()).count() as u64;
        self.tasks_tx.send_replace(tasks);
        self.pending_tx.send_if_modified(|current| {
            if *current == pending {
                return false;
            }
            *current = pending;
            true
        });
        Ok(())
    }
}
