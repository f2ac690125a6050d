//! Schema metadata persistence.
//!
//! Stores the extracted table/view snapshots per connection. A refresh
//! replaces the whole snapshot inside one transaction so readers never see a
//! half-written mix of old and new rows.

use crate::adapter::{ColumnMeta, MetadataRecord, ObjectType};
use crate::error::{Result, ScoutError};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

/// Raw stored metadata row; columns are kept as JSON text.
#[derive(Debug, Clone, FromRow)]
struct RawMetadataRow {
    id: i64,
    connection_id: i64,
    object_type: String,
    schema_name: Option<String>,
    object_name: String,
    columns: String,
    created_at: String,
    updated_at: String,
}

/// A stored metadata snapshot entry with decoded columns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRow {
    pub id: i64,
    pub connection_id: i64,
    pub object_type: ObjectType,
    pub schema_name: Option<String>,
    pub object_name: String,
    pub columns: Vec<ColumnMeta>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<RawMetadataRow> for MetadataRow {
    type Error = ScoutError;

    fn try_from(raw: RawMetadataRow) -> Result<Self> {
        let object_type = ObjectType::parse(&raw.object_type).ok_or_else(|| {
            ScoutError::internal(format!("Unknown stored object type '{}'", raw.object_type))
        })?;
        let columns: Vec<ColumnMeta> = serde_json::from_str(&raw.columns)
            .map_err(|e| ScoutError::internal(format!("Corrupt stored column metadata: {e}")))?;

        Ok(Self {
            id: raw.id,
            connection_id: raw.connection_id,
            object_type,
            schema_name: raw.schema_name,
            object_name: raw.object_name,
            columns,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

/// Atomically replaces the metadata snapshot for one connection.
///
/// Delete and inserts run in one transaction; any failure rolls back and
/// leaves the previous snapshot intact. Returns the number of rows written.
pub async fn replace_for_connection(
    pool: &SqlitePool,
    connection_id: i64,
    records: &[MetadataRecord],
) -> Result<usize> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to begin transaction: {e}")))?;

    sqlx::query("DELETE FROM database_metadata WHERE connection_id = ?")
        .bind(connection_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to clear old metadata: {e}")))?;

    for record in records {
        let columns_json = serde_json::to_string(&record.columns)
            .map_err(|e| ScoutError::internal(format!("Failed to encode columns: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO database_metadata
                (connection_id, object_type, schema_name, object_name, columns)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(connection_id)
        .bind(record.object_type.as_str())
        .bind(&record.schema_name)
        .bind(&record.object_name)
        .bind(&columns_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to write metadata: {e}")))?;
    }

    tx.commit()
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to commit metadata: {e}")))?;

    Ok(records.len())
}

/// Lists the stored snapshot for one connection, ordered by schema and name.
pub async fn list_for_connection(
    pool: &SqlitePool,
    connection_id: i64,
) -> Result<Vec<MetadataRow>> {
    let rows: Vec<RawMetadataRow> = sqlx::query_as(
        r#"
        SELECT id, connection_id, object_type, schema_name, object_name,
               columns, created_at, updated_at
        FROM database_metadata
        WHERE connection_id = ?
        ORDER BY schema_name, object_name
        "#,
    )
    .bind(connection_id)
    .fetch_all(pool)
    .await
    .map_err(|e| ScoutError::internal(format!("Failed to list metadata: {e}")))?;

    rows.into_iter().map(MetadataRow::try_from).collect()
}

/// Counts stored metadata rows for one connection.
pub async fn count_for_connection(pool: &SqlitePool, connection_id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM database_metadata WHERE connection_id = ?")
        .bind(connection_id)
        .fetch_one(pool)
        .await
        .map_err(|e| ScoutError::internal(format!("Failed to count metadata: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MetaStore, NewConnection};

    async fn store_with_connection() -> (MetaStore, i64) {
        let store = MetaStore::open_in_memory().await.unwrap();
        let conn = store
            .insert_connection(&NewConnection {
                name: "prod".to_string(),
                url: "postgresql://u:p@localhost:5432/app".to_string(),
                description: None,
                is_active: true,
            })
            .await
            .unwrap();
        (store, conn.id)
    }

    fn record(name: &str) -> MetadataRecord {
        MetadataRecord {
            schema_name: Some("public".to_string()),
            object_name: name.to_string(),
            object_type: ObjectType::Table,
            columns: vec![ColumnMeta {
                name: "id".to_string(),
                data_type: "bigint".to_string(),
                is_nullable: false,
                is_primary_key: true,
                default_value: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_replace_writes_snapshot() {
        let (store, conn_id) = store_with_connection().await;

        let written = store
            .replace_metadata(conn_id, &[record("users"), record("orders")])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let rows = store.list_metadata(conn_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].object_name, "orders");
        assert_eq!(rows[0].columns[0].name, "id");
        assert!(rows[0].columns[0].is_primary_key);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_snapshot() {
        let (store, conn_id) = store_with_connection().await;

        store
            .replace_metadata(conn_id, &[record("users"), record("orders")])
            .await
            .unwrap();
        store.replace_metadata(conn_id, &[record("users")]).await.unwrap();

        let rows = store.list_metadata(conn_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].object_name, "users");
    }

    #[tokio::test]
    async fn test_replace_with_empty_clears() {
        let (store, conn_id) = store_with_connection().await;

        store.replace_metadata(conn_id, &[record("users")]).await.unwrap();
        store.replace_metadata(conn_id, &[]).await.unwrap();

        assert_eq!(store.count_metadata(conn_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_connection_cascades() {
        let (store, conn_id) = store_with_connection().await;

        store.replace_metadata(conn_id, &[record("users")]).await.unwrap();
        assert_eq!(store.count_metadata(conn_id).await.unwrap(), 1);

        store.delete_connection(conn_id).await.unwrap();
        assert_eq!(store.count_metadata(conn_id).await.unwrap(), 0);
    }
}
