//! Registered connection persistence.
//!
//! CRUD operations for the target databases a user has registered. Only the
//! connection URL and descriptive fields are stored; pool state lives in
//! [`crate::pool::PoolManager`].

use crate::error::{Result, ScoutError};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// A registered target database, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredConnection {
    pub id: i64,
    /// Unique, case-sensitive display name.
    pub name: String,
    /// Full connection URL including credentials.
    pub url: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for registering a new connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConnection {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update for a stored connection. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConnection {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

const SELECT_COLUMNS: &str =
    "id, name, url, description, is_active, created_at, updated_at";

/// Lists all stored connections, ordered by name.
pub async fn list(pool: &SqlitePool) -> Result<Vec<StoredConnection>> {
    let rows: Vec<StoredConnection> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM database_connections ORDER BY name"
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to list connections: {e}")))?;

    Ok(rows)
}

/// Gets a stored connection by id.
pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<StoredConnection>> {
    let row: Option<StoredConnection> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM database_connections WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to get connection: {e}")))?;

    Ok(row)
}

/// Gets a stored connection by exact name. Lookup is case-sensitive:
/// `Prod` and `prod` are distinct connections.
pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<StoredConnection>> {
    let row: Option<StoredConnection> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLUMNS} FROM database_connections WHERE name = ?"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to get connection: {e}")))?;

    Ok(row)
}

/// Returns true if the name is already used by a connection other than
/// `exclude_id`.
pub async fn name_taken(pool: &SqlitePool, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM database_connections WHERE name = ? AND id != ?",
    )
    .bind(name)
    .bind(exclude_id.unwrap_or(-1))
    .fetch_one(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to check connection name: {e}")))?;

    Ok(count > 0)
}

/// Inserts a new connection and returns it with generated fields.
pub async fn insert(pool: &SqlitePool, new: &NewConnection) -> Result<StoredConnection> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO database_connections (name, url, description, is_active)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&new.name)
    .bind(&new.url)
    .bind(&new.description)
    .bind(new.is_active)
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique_violation(e, &new.name))?;

    get_by_id(pool, id)
        .await?
        .ok_or_else(|| ScoutError::internal("Inserted connection not found"))
}

/// Applies a partial update. Returns `None` when the id does not exist.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &UpdateConnection,
) -> Result<Option<StoredConnection>> {
    let Some(current) = get_by_id(pool, id).await? else {
        return Ok(None);
    };

    let name = changes.name.as_deref().unwrap_or(&current.name);
    let url = changes.url.as_deref().unwrap_or(&current.url);
    let description = changes
        .description
        .as_deref()
        .or(current.description.as_deref());
    let is_active = changes.is_active.unwrap_or(current.is_active);

    sqlx::query(
        r#"
        UPDATE database_connections
        SET name = ?, url = ?, description = ?, is_active = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(url)
    .bind(description)
    .bind(is_active)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| map_unique_violation(e, name))?;

    get_by_id(pool, id).await
}

/// Deletes a connection. Metadata rows cascade. Returns true if a row was
/// deleted.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM database_connections WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to delete connection: {e}")))?;

    Ok(result.rows_affected() > 0)
}

fn map_unique_violation(e: sqlx::Error, name: &str) -> ScoutError {
    if e.to_string().contains("UNIQUE constraint") {
        ScoutError::conflict(format!("Connection '{name}' already exists"))
    } else {
        ScoutError::internal(format!("Failed to write connection: {e}"))
    }
}
