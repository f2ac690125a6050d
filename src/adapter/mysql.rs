//! MySQL adapter.
//!
//! Implements [`DatabaseAdapter`] over a sqlx `MySqlPool`. MySQL has no schema
//! concept separate from the database, so listings report the database name as
//! the schema and `list_columns` falls back to the connection's current
//! database. Catalog columns are CAST to CHAR to avoid BINARY type mismatches
//! when decoding into String.

use crate::adapter::{
    decimal_to_value, returns_rows, ColumnInfo, ColumnMeta, DatabaseAdapter, ObjectRef,
    ObjectType, QueryOutput, Value,
};
use crate::engine::EngineType;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Schemas owned by the server, never part of user metadata.
const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// MySQL adapter over a shared pool handle.
#[derive(Debug, Clone)]
pub struct MySqlAdapter {
    pool: MySqlPool,
}

impl MySqlAdapter {
    /// Creates an adapter from an existing pool handle.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    fn engine(&self) -> EngineType {
        EngineType::MySql
    }

    async fn test_connection(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn list_tables(&self) -> Result<Vec<ObjectRef>> {
        self.list_objects("BASE TABLE", ObjectType::Table).await
    }

    async fn list_views(&self) -> Result<Vec<ObjectRef>> {
        self.list_objects("VIEW", ObjectType::View).await
    }

    async fn list_columns(&self, schema: Option<&str>, object: &str) -> Result<Vec<ColumnMeta>> {
        // DATABASE() resolves to the connection's current database when no
        // schema was given.
        let rows: Vec<(String, String, String, Option<String>, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(c.COLUMN_NAME AS CHAR) AS column_name,
                CAST(c.COLUMN_TYPE AS CHAR) AS column_type,
                CAST(c.IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(c.COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(c.COLUMN_KEY AS CHAR) AS column_key
            FROM information_schema.COLUMNS c
            WHERE c.TABLE_SCHEMA = COALESCE(?, DATABASE()) AND c.TABLE_NAME = ?
            ORDER BY c.ORDINAL_POSITION
            "#,
        )
        .bind(schema)
        .bind(object)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default_value, column_key)| ColumnMeta {
                name,
                data_type,
                is_nullable: is_nullable == "YES",
                is_primary_key: column_key == "PRI",
                default_value,
            })
            .collect())
    }

    async fn execute_query(&self, sql: &str, timeout: Duration) -> Result<QueryOutput> {
        let start = Instant::now();

        let mut conn = self.pool.acquire().await?;
        let timeout_ms = timeout.as_millis();
        // max_execution_time only bounds SELECT, which is all that reaches us.
        conn.execute(format!("SET SESSION max_execution_time = {timeout_ms}").as_str())
            .await?;

        // The validator only admits SELECTs today, but the adapter honors
        // non-fetch statements with an affected-row count.
        if !returns_rows(sql) {
            let done = conn.execute(sql).await?;
            return Ok(QueryOutput {
                columns: Vec::new(),
                rows: Vec::new(),
                row_count: done.rows_affected() as usize,
                execution_time_ms: start.elapsed().as_millis() as u64,
            });
        }

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let columns: Vec<ColumnInfo> = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect()
            })
            .unwrap_or_default();

        debug!(rows = rows.len(), elapsed_ms = execution_time_ms, "mysql query complete");

        let rows: Vec<Vec<Value>> = rows.iter().map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryOutput {
            columns,
            rows,
            row_count,
            execution_time_ms,
        })
    }
}

impl MySqlAdapter {
    async fn list_objects(&self, table_type: &str, object_type: ObjectType) -> Result<Vec<ObjectRef>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(TABLE_SCHEMA AS CHAR) AS table_schema,
                CAST(TABLE_NAME AS CHAR) AS table_name
            FROM information_schema.TABLES
            WHERE TABLE_TYPE = ?
                AND TABLE_SCHEMA NOT IN (?, ?, ?, ?)
            ORDER BY TABLE_SCHEMA, TABLE_NAME
            "#,
        )
        .bind(table_type)
        .bind(SYSTEM_SCHEMAS[0])
        .bind(SYSTEM_SCHEMAS[1])
        .bind(SYSTEM_SCHEMAS[2])
        .bind(SYSTEM_SCHEMAS[3])
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(schema, name)| ObjectRef {
                schema: Some(schema),
                name,
                object_type,
            })
            .collect())
    }
}

/// Converts a sqlx MySqlRow into a row of engine-neutral values.
fn convert_row(row: &MySqlRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a MySqlRow by MySQL type name.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOLEAN" | "TINYINT(1)" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .flatten()
            .map(|v| {
                i64::try_from(v)
                    .map(Value::Int)
                    .unwrap_or_else(|_| Value::String(v.to_string()))
            })
            .unwrap_or(Value::Null),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "DECIMAL" | "NEWDECIMAL" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(index)
            .ok()
            .flatten()
            .map(decimal_to_value)
            .unwrap_or(Value::Null),

        // sqlx maps TIMESTAMP to an instant and DATETIME to a wall time.
        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),

        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
