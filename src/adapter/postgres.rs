//! PostgreSQL adapter.
//!
//! Implements [`DatabaseAdapter`] over a sqlx `PgPool`. Schema listings come
//! from `information_schema` with the system schemas excluded; query results
//! are decoded into engine-neutral [`Value`]s by Postgres type name.

use crate::adapter::{
    decimal_to_value, returns_rows, ColumnInfo, ColumnMeta, DatabaseAdapter, ObjectRef,
    ObjectType, QueryOutput, Value,
};
use crate::engine::EngineType;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// PostgreSQL adapter over a shared pool handle.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Creates an adapter from an existing pool handle.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn effective_schema<'a>(&self, schema: Option<&'a str>) -> &'a str {
        schema.unwrap_or("public")
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn engine(&self) -> EngineType {
        EngineType::Postgres
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
        let schema = self.effective_schema(schema);

        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                column_name::text,
                data_type::text,
                is_nullable::text,
                column_default::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(schema)
        .bind(object)
        .fetch_all(&self.pool)
        .await?;

        let pk_columns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = $1
                AND tc.table_name = $2
                AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
            "#,
        )
        .bind(schema)
        .bind(object)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default_value)| ColumnMeta {
                is_primary_key: pk_columns.contains(&name),
                name,
                data_type,
                is_nullable: is_nullable == "YES",
                default_value,
            })
            .collect())
    }

    async fn execute_query(&self, sql: &str, timeout: Duration) -> Result<QueryOutput> {
        let start = Instant::now();

        // A dedicated connection so the statement timeout cannot leak into
        // other queries sharing the pool.
        let mut conn = self.pool.acquire().await?;
        let timeout_ms = timeout.as_millis();
        conn.execute(format!("SET statement_timeout = {timeout_ms}").as_str())
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

        debug!(rows = rows.len(), elapsed_ms = execution_time_ms, "postgres query complete");

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

impl PostgresAdapter {
    async fn list_objects(&self, table_type: &str, object_type: ObjectType) -> Result<Vec<ObjectRef>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT table_schema::text, table_name::text
            FROM information_schema.tables
            WHERE table_type = $1
                AND table_schema NOT IN ('pg_catalog', 'information_schema')
            ORDER BY table_schema, table_name
            "#,
        )
        .bind(table_type)
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

/// Converts a sqlx PgRow into a row of engine-neutral values.
fn convert_row(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow by Postgres type name.
///
/// Unknown types fall back to text decoding; anything undecodable becomes
/// NULL rather than failing the whole result set.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "NUMERIC" | "DECIMAL" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(index)
            .ok()
            .flatten()
            .map(decimal_to_value)
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
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
