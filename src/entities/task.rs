use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::ids;

/// Synchronization state of a locally stored task.
///
/// `Synced` is the only quiescent state; every `Pending*` state is drained by
/// a reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    #[sea_orm(string_value = "SYNCED")]
    Synced,
    #[sea_orm(string_value = "PENDING_CREATE")]
    PendingCreate,
    #[sea_orm(string_value = "PENDING_UPDATE")]
    PendingUpdate,
    #[sea_orm(string_value = "PENDING_DELETE")]
    PendingDelete,
}

impl SyncStatus {
    pub fn is_pending(self) -> bool {
        self != SyncStatus::Synced
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    /// Server id rendered as a string, or a `local-` temporary id
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub sync_status: SyncStatus,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds, never below `created_at`
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this task only exists locally under a temporary id.
    pub fn has_local_id(&self) -> bool {
        ids::is_temporary_id(&self.id)
    }

    pub fn is_pending(&self) -> bool {
        self.sync_status.is_pending()
    }

    /// Copy of this task carrying a different sync status.
    pub fn with_status(&self, sync_status: SyncStatus) -> Self {
        Self {
            sync_status,
            ..self.clone()
        }
    }
}
