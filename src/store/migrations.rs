//! Schema versioning and migrations for the state database.
//!
//! Forward-only migrations; a database newer than the code refuses to open.

use crate::error::{Result, ScoutError};
use sqlx::sqlite::SqlitePool;
use tracing::info;

const CURRENT_VERSION: i32 = 1;

/// Runs all pending migrations on the database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    ensure_schema_versions_table(pool).await?;

    let current = get_current_version(pool).await?;

    if current > CURRENT_VERSION {
        return Err(ScoutError::configuration(format!(
            "Database schema version ({current}) is newer than supported version \
             ({CURRENT_VERSION}). Please upgrade db-scout to the latest version."
        )));
    }

    if current < CURRENT_VERSION {
        info!(
            "Migrating state database from version {} to {}",
            current, CURRENT_VERSION
        );
        run_pending_migrations(pool, current).await?;
    }

    Ok(())
}

/// Ensures the schema_versions table exists.
async fn ensure_schema_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to create schema_versions table: {e}")))?;

    Ok(())
}

/// Gets the current schema version.
async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM schema_versions")
        .fetch_optional(pool)
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to get schema version: {e}")))?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Runs migrations from the current version to the target version.
async fn run_pending_migrations(pool: &SqlitePool, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        run_migration(pool, version).await?;
        record_version(pool, version).await?;
        info!("Applied migration v{}", version);
    }
    Ok(())
}

/// Records a completed migration version.
async fn record_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_versions (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to record migration: {e}")))?;
    Ok(())
}

/// Runs a specific migration version.
async fn run_migration(pool: &SqlitePool, version: i32) -> Result<()> {
    match version {
        1 => migration_v1(pool).await,
        _ => Err(ScoutError::internal(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: registered connections, metadata snapshots, execution log.
async fn migration_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS database_connections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        ScoutError::internal(format!("Failed to create database_connections table: {e}"))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS database_metadata (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_id INTEGER NOT NULL,
            object_type TEXT NOT NULL CHECK (object_type IN ('table', 'view')),
            schema_name TEXT,
            object_name TEXT NOT NULL,
            columns TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (connection_id, schema_name, object_name),
            FOREIGN KEY (connection_id)
                REFERENCES database_connections(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to create database_metadata table: {e}")))?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_metadata_connection
        ON database_metadata(connection_id)
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to create metadata index: {e}")))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS query_executions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_id INTEGER,
            input_sql TEXT NOT NULL,
            generated_sql TEXT,
            sanitized_sql TEXT,
            status TEXT NOT NULL CHECK (status IN ('pending', 'success', 'error', 'timeout')),
            error_message TEXT,
            execution_time_ms INTEGER,
            row_count INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (connection_id)
                REFERENCES database_connections(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to create query_executions table: {e}")))?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_executions_created
        ON query_executions(created_at)
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to create executions index: {e}")))?;

    Ok(())
}
