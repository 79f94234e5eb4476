//! Remote Task Gateway abstraction.
//!
//! This module defines the interface the sync engine uses to reach the remote
//! task API, along with the wire data types and error handling. The gateway
//! is stateless: every call is an independent request/response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::task::{self, SyncStatus};
use crate::utils::datetime;

pub mod auth;
pub mod factory;
pub mod http;

pub use auth::{AuthTokenProvider, EnvTokenProvider, StaticTokenProvider};
pub use http::HttpTaskGateway;

/// Common error types for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Gateway error: {0}")]
    Other(String),
}

/// Task as it travels over the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTask {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "userId", default)]
    pub user_id: u64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl RemoteTask {
    /// Convert to a local record tagged `SYNCED`.
    ///
    /// Servers that omit timestamps send neither field; a missing `created_at`
    /// becomes the current time and a missing `updated_at` copies it.
    pub fn into_local(self) -> task::Model {
        let created_at = if self.created_at > 0 {
            self.created_at
        } else {
            datetime::now_millis()
        };
        let updated_at = if self.updated_at > 0 {
            self.updated_at.max(created_at)
        } else {
            created_at
        };
        task::Model {
            id: self.id.to_string(),
            title: self.title,
            description: self.body,
            is_completed: self.completed,
            sync_status: SyncStatus::Synced,
            created_at,
            updated_at,
        }
    }
}

/// Pagination block returned alongside a page of tasks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

/// One page of the task listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPage {
    pub data: Vec<RemoteTask>,
    pub pagination: PageInfo,
}

/// Arguments for creating a new task.
#[derive(Clone, Debug)]
pub struct CreateTaskArgs {
    pub title: String,
    pub description: String,
}

/// Arguments for updating a task. `None` fields are left unchanged remotely.
#[derive(Clone, Debug, Default)]
pub struct UpdateTaskArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl From<&task::Model> for CreateTaskArgs {
    fn from(task: &task::Model) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }
}

impl From<&task::Model> for UpdateTaskArgs {
    fn from(task: &task::Model) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            completed: Some(task.is_completed),
        }
    }
}

/// Request/response wrapper over the remote CRUD endpoints.
///
/// Implementations must bound every request with a finite timeout so a hung
/// call cannot hold the reconciliation guard forever.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Returns the gateway type identifier (e.g., "http").
    fn gateway_type(&self) -> &str;

    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<TaskPage, GatewayError>;
    async fn fetch_task(&self, remote_id: &str) -> Result<RemoteTask, GatewayError>;
    async fn create_task(&self, args: CreateTaskArgs) -> Result<RemoteTask, GatewayError>;
    async fn update_task(&self, remote_id: &str, args: UpdateTaskArgs) -> Result<RemoteTask, GatewayError>;
    async fn delete_task(&self, remote_id: &str) -> Result<(), GatewayError>;
}
