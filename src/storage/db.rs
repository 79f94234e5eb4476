use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};

use crate::config::StorageConfig;
use crate::entities::task;

/// Connections are never reaped; an in-memory database lives exactly as long as its connection.
const CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// SQLite-backed local storage for task records
pub struct LocalStorage {
    pub(crate) conn: DatabaseConnection,
}

impl LocalStorage {
    /// Open the database described by the storage configuration.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        if config.in_memory {
            return Self::in_memory().await;
        }

        let path = config.resolve_database_path()?;
        Self::open_file(&path).await
    }

    /// Open (or create) a database file.
    pub async fn open_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create storage directory: {}", parent.display()))?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());
        info!("Opening task database at {}", path.display());
        Self::connect(&url, 4).await
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        // A single pooled connection keeps the whole in-memory database.
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let mut options = ConnectOptions::new(url.to_string());
        options
            .min_connections(1)
            .max_connections(max_connections)
            .idle_timeout(CONNECTION_LIFETIME)
            .max_lifetime(CONNECTION_LIFETIME)
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;

        let storage = LocalStorage { conn };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize database schema from the entity definitions
    async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut create_tasks = schema.create_table_from_entity(task::Entity);
        create_tasks.if_not_exists();
        self.conn
            .execute(backend.build(&create_tasks))
            .await
            .context("Failed to create tasks table")?;

        Ok(())
    }
}
