use log::info;

use crate::backend::{PageInfo, RemoteTask};
use crate::entities::task;
use crate::sync::{SyncError, SyncService};

/// Where paging stands after a fetch. Not persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub has_more: bool,
    /// Offset to request for the next page
    pub offset: u64,
    pub total: u64,
}

impl PaginationState {
    /// State following a page the server described with `info`.
    pub fn after(info: &PageInfo, page_size: u64) -> Self {
        Self {
            has_more: info.has_more,
            offset: info.offset + page_size,
            total: info.total,
        }
    }
}

impl SyncService {
    /// Re-fetches the first page and merges it into local storage.
    ///
    /// Synced tasks missing from the page are treated as deleted on the
    /// server and purged. Pending tasks are never pruned, and a local pending
    /// copy always wins over the server copy of the same id.
    ///
    /// # Errors
    /// Returns `SyncError::Offline` when offline, `SyncError::Remote` if the
    /// fetch fails and `SyncError::Storage` if the merge fails
    pub async fn refresh(&self) -> Result<PaginationState, SyncError> {
        self.fetch_and_merge(0, true).await
    }

    /// Fetches the page at `offset` and merges it without pruning anything.
    pub async fn load_more(&self, offset: u64) -> Result<PaginationState, SyncError> {
        self.fetch_and_merge(offset, false).await
    }

    async fn fetch_and_merge(&self, offset: u64, prune: bool) -> Result<PaginationState, SyncError> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }

        let page = self.gateway.fetch_page(self.page_size, offset).await?;
        let remote: Vec<task::Model> = page.data.into_iter().map(RemoteTask::into_local).collect();
        let stats = self.store.merge_page(&remote, prune).await?;

        info!(
            "Merged page at offset {}: {} stored, {} kept local, {} pruned",
            offset, stats.upserted, stats.kept_local, stats.pruned
        );
        Ok(PaginationState::after(&page.pagination, self.page_size))
    }
}
