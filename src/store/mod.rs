//! Local metadata store.
//!
//! SQLite-backed storage for registered connections, extracted schema
//! metadata, and the query execution log. The target databases are never
//! written to; everything db-scout persists lives here.

mod connections;
mod executions;
mod metadata;
mod migrations;

pub use connections::{NewConnection, StoredConnection, UpdateConnection};
pub use executions::{ExecutionRecord, ExecutionStatus, NewExecution};
pub use metadata::MetadataRow;

use crate::adapter::MetadataRecord;
use crate::error::{Result, ScoutError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;

/// Main persistence interface for the local state database.
pub struct MetaStore {
    pool: SqlitePool,
}

impl MetaStore {
    /// Opens or creates the store at the default platform path.
    ///
    /// - Linux/macOS: `~/.config/db-scout/state.db`
    /// - Windows: `%APPDATA%\db-scout\state.db`
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path()?;
        Self::open(&path).await
    }

    /// Opens or creates the store at the specified path.
    pub async fn open(path: &PathBuf) -> Result<Self> {
        Self::ensure_parent_dirs(path)?;
        let conn_str = format!("sqlite:{}?mode=rwc", path.display());

        match Self::try_open(&conn_str).await {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!("Failed to open state database: {e}. Attempting recovery...");
                Self::attempt_recovery(path, &conn_str).await
            }
        }
    }

    /// Opens an in-memory store. For tests.
    pub async fn open_in_memory() -> Result<Self> {
        Self::try_open("sqlite::memory:").await
    }

    /// Returns the default state database path for the current platform.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ScoutError::configuration("Could not determine config directory"))?;
        Ok(config_dir.join("db-scout").join("state.db"))
    }

    /// Attempts to open the database with retries for lock contention.
    async fn try_open(conn_str: &str) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * 2u64.pow(attempt)))
                    .await;
            }

            match Self::connect(conn_str).await {
                Ok(pool) => {
                    migrations::run_migrations(&pool).await?;
                    info!("State database ready");
                    return Ok(Self { pool });
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ScoutError::internal("Failed to open database after retries")))
    }

    /// Creates a connection pool to the SQLite database.
    async fn connect(conn_str: &str) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(conn_str)
            .map_err(|e| ScoutError::configuration(format!("Invalid database path: {e}")))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                ScoutError::internal(format!("Failed to connect to state database: {e}"))
            })
    }

    /// Ensures parent directories exist for the database path.
    fn ensure_parent_dirs(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ScoutError::configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Recovers from a corrupted database by backing it up and recreating.
    async fn attempt_recovery(path: &PathBuf, conn_str: &str) -> Result<Self> {
        let backup_path = path.with_extension("db.bak");

        if path.exists() {
            std::fs::rename(path, &backup_path).map_err(|e| {
                ScoutError::internal(format!(
                    "Failed to backup corrupted database to {}: {e}",
                    backup_path.display()
                ))
            })?;
            warn!("Backed up corrupted database to {}", backup_path.display());
        }

        Self::try_open(conn_str).await.map_err(|e| {
            ScoutError::internal(format!("Database recovery failed: {e}"))
        })
    }

    /// Closes the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // Connections

    /// Lists all stored connections, ordered by name.
    pub async fn list_connections(&self) -> Result<Vec<StoredConnection>> {
        connections::list(&self.pool).await
    }

    /// Gets a stored connection by id.
    pub async fn get_connection(&self, id: i64) -> Result<Option<StoredConnection>> {
        connections::get_by_id(&self.pool, id).await
    }

    /// Gets a stored connection by exact (case-sensitive) name.
    pub async fn get_connection_by_name(&self, name: &str) -> Result<Option<StoredConnection>> {
        connections::get_by_name(&self.pool, name).await
    }

    /// Returns true if a different connection (one with another id, or any
    /// when `exclude_id` is None) already uses this name.
    pub async fn connection_name_taken(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        connections::name_taken(&self.pool, name, exclude_id).await
    }

    /// Inserts a new stored connection and returns it with generated fields.
    pub async fn insert_connection(&self, new: &NewConnection) -> Result<StoredConnection> {
        connections::insert(&self.pool, new).await
    }

    /// Applies a partial update and returns the updated row.
    pub async fn update_connection(
        &self,
        id: i64,
        changes: &UpdateConnection,
    ) -> Result<Option<StoredConnection>> {
        connections::update(&self.pool, id, changes).await
    }

    /// Deletes a stored connection; cascades to its metadata. Returns true
    /// if a row was deleted.
    pub async fn delete_connection(&self, id: i64) -> Result<bool> {
        connections::delete(&self.pool, id).await
    }

    // Metadata

    /// Atomically replaces the metadata snapshot for one connection.
    pub async fn replace_metadata(
        &self,
        connection_id: i64,
        records: &[MetadataRecord],
    ) -> Result<usize> {
        metadata::replace_for_connection(&self.pool, connection_id, records).await
    }

    /// Lists the stored metadata snapshot for one connection.
    pub async fn list_metadata(&self, connection_id: i64) -> Result<Vec<MetadataRow>> {
        metadata::list_for_connection(&self.pool, connection_id).await
    }

    /// Counts stored metadata rows for one connection.
    pub async fn count_metadata(&self, connection_id: i64) -> Result<i64> {
        metadata::count_for_connection(&self.pool, connection_id).await
    }

    // Execution log

    /// Appends an entry to the query execution log.
    pub async fn record_execution(&self, new: &NewExecution) -> Result<i64> {
        executions::record(&self.pool, new).await
    }

    /// Lists the most recent execution log entries, newest first.
    pub async fn list_executions(&self, limit: i64) -> Result<Vec<ExecutionRecord>> {
        executions::list_recent(&self.pool, limit).await
    }
}
