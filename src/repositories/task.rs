//! Task repository for database operations.

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::task::{self, SyncStatus};

/// Repository for task-related database operations.
///
/// Every method is generic over [`ConnectionTrait`] so it can run either on
/// the plain connection or inside a transaction.
pub struct TaskRepository;

impl TaskRepository {
    /// Get all tasks, most recently created first.
    pub async fn get_all<C>(conn: &C) -> Result<Vec<task::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::Id)
            .all(conn)
            .await
    }

    /// Get a single task by id.
    pub async fn get_by_id<C>(conn: &C, id: &str) -> Result<Option<task::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        task::Entity::find_by_id(id.to_string()).one(conn).await
    }

    /// Get every task whose local state has not reached the server yet.
    pub async fn get_pending<C>(conn: &C) -> Result<Vec<task::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        task::Entity::find()
            .filter(task::Column::SyncStatus.ne(SyncStatus::Synced))
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(conn)
            .await
    }

    /// Count tasks that are not synced.
    pub async fn count_pending<C>(conn: &C) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        task::Entity::find()
            .filter(task::Column::SyncStatus.ne(SyncStatus::Synced))
            .count(conn)
            .await
    }

    /// Insert a task, overwriting every column of an existing row with the same id.
    pub async fn upsert<C>(conn: &C, task: &task::Model) -> Result<(), DbErr>
    where
        C: ConnectionTrait,
    {
        let model = task::ActiveModel {
            id: ActiveValue::Set(task.id.clone()),
            title: ActiveValue::Set(task.title.clone()),
            description: ActiveValue::Set(task.description.clone()),
            is_completed: ActiveValue::Set(task.is_completed),
            sync_status: ActiveValue::Set(task.sync_status),
            created_at: ActiveValue::Set(task.created_at),
            updated_at: ActiveValue::Set(task.updated_at),
        };

        task::Entity::insert(model)
            .on_conflict(
                OnConflict::column(task::Column::Id)
                    .update_columns([
                        task::Column::Title,
                        task::Column::Description,
                        task::Column::IsCompleted,
                        task::Column::SyncStatus,
                        task::Column::CreatedAt,
                        task::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    /// Delete a task by id. Returns whether a row was removed.
    pub async fn delete_by_id<C>(conn: &C, id: &str) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = task::Entity::delete_by_id(id.to_string()).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Delete all synced tasks whose id is not in `keep`. Returns the number of rows removed.
    pub async fn delete_synced_except<C>(conn: &C, keep: &[String]) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = task::Entity::delete_many()
            .filter(task::Column::SyncStatus.eq(SyncStatus::Synced))
            .filter(task::Column::Id.is_not_in(keep.iter().cloned()))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}
