//! Database adapter abstraction.
//!
//! Provides a trait-based interface over the supported engines, allowing the
//! services to browse schema metadata and run queries without knowing which
//! database they are talking to. Adapters are thin wrappers over pools handed
//! out by [`crate::pool::PoolManager`]; they never own connection lifecycle.

mod mock;
mod mysql;
mod postgres;

pub use mock::{FailingAdapter, MockAdapter};
pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;

use crate::engine::EngineType;
use crate::error::{Result, ScoutError};
use crate::pool::EnginePool;
use async_trait::async_trait;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Kind of schema object an adapter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Table,
    View,
}

impl ObjectType {
    /// Returns the object type as a string for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
        }
    }

    /// Parses an object type from its persisted form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "table" => Some(Self::Table),
            "view" => Some(Self::View),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A table or view as reported by the target database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    /// Schema the object lives in. `None` for engines without a schema
    /// concept separate from the database (MySQL).
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
    /// Whether this is a table or a view.
    pub object_type: ObjectType,
}

/// Column description extracted from the target database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    /// Column name.
    pub name: String,
    /// Engine-native type name.
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub is_nullable: bool,
    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
    /// Default expression, if any.
    pub default_value: Option<String>,
}

/// A full metadata snapshot entry for one schema object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub schema_name: Option<String>,
    pub object_name: String,
    pub object_type: ObjectType,
    pub columns: Vec<ColumnMeta>,
}

/// Metadata about a column in a query result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name as reported by the driver.
    pub name: String,
    /// Engine-native type name.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type RowValues = Vec<Value>;

/// The result of executing a SQL query against a target database.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,
    /// Rows of data.
    pub rows: Vec<RowValues>,
    /// Number of rows returned.
    pub row_count: usize,
    /// Time taken to execute the query, in milliseconds.
    pub execution_time_ms: u64,
}

impl QueryOutput {
    /// Creates a query output with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<RowValues>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms: 0,
        }
    }
}

/// A single value from a database result.
///
/// Serialization is JSON-safe: `Null` maps to JSON null and binary data is
/// rendered as lossy UTF-8 with replacement characters dropped, so a result
/// set always survives `serde_json` without error.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (up to i64).
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text value.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value for display and JSON output.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => lossy_text(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&lossy_text(b)),
        }
    }
}

/// Decodes bytes as UTF-8, dropping the U+FFFD markers lossy decoding inserts.
fn lossy_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != '\u{FFFD}')
        .collect()
}

/// Converts an arbitrary-precision decimal to a JSON-safe value.
///
/// Decimals that cannot be represented as f64 fall back to their exact text
/// form rather than NULL.
pub(crate) fn decimal_to_value(v: rust_decimal::Decimal) -> Value {
    use rust_decimal::prelude::ToPrimitive;
    v.to_f64()
        .map(Value::Float)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

/// Returns true when the statement's leading keyword produces a row set.
pub(crate) fn returns_rows(sql: &str) -> bool {
    sql.trim_start()
        .split_whitespace()
        .next()
        .map(|word| {
            matches!(
                word.to_uppercase().as_str(),
                "SELECT" | "WITH" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN"
            )
        })
        .unwrap_or(false)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Trait defining the interface for database adapters.
///
/// All operations are async and return Results with [`ScoutError`]. An adapter
/// is cheap to construct: it holds a cloned pool handle, never a connection.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Returns the engine this adapter talks to.
    fn engine(&self) -> EngineType;

    /// Probes the connection with a trivial query. Never errors; an
    /// unreachable or misconfigured target reports `false`.
    async fn test_connection(&self) -> bool;

    /// Lists user tables, excluding system schemas.
    async fn list_tables(&self) -> Result<Vec<ObjectRef>>;

    /// Lists user views, excluding system schemas.
    async fn list_views(&self) -> Result<Vec<ObjectRef>>;

    /// Lists columns of one table or view. A `None` schema falls back to the
    /// engine default (`public` for Postgres, the current database for MySQL).
    async fn list_columns(&self, schema: Option<&str>, object: &str) -> Result<Vec<ColumnMeta>>;

    /// Executes a read query. `timeout` is applied server-side as a statement
    /// timeout where the engine supports it; the wall-clock bound is enforced
    /// by the caller.
    async fn execute_query(&self, sql: &str, timeout: Duration) -> Result<QueryOutput>;
}

/// Collects a full metadata snapshot from an adapter.
///
/// Composes the trait's listing operations: every table and view is fetched
/// together with its columns. This is a free function rather than a trait
/// method so every adapter gets the same composition.
pub async fn collect_metadata(adapter: &dyn DatabaseAdapter) -> Result<Vec<MetadataRecord>> {
    let mut objects = adapter.list_tables().await?;
    objects.extend(adapter.list_views().await?);

    let mut records = Vec::with_capacity(objects.len());
    for obj in objects {
        let columns = adapter.list_columns(obj.schema.as_deref(), &obj.name).await?;
        records.push(MetadataRecord {
            schema_name: obj.schema,
            object_name: obj.name,
            object_type: obj.object_type,
            columns,
        });
    }
    Ok(records)
}

#[async_trait]
impl<T: DatabaseAdapter + ?Sized> DatabaseAdapter for std::sync::Arc<T> {
    fn engine(&self) -> EngineType {
        (**self).engine()
    }

    async fn test_connection(&self) -> bool {
        (**self).test_connection().await
    }

    async fn list_tables(&self) -> Result<Vec<ObjectRef>> {
        (**self).list_tables().await
    }

    async fn list_views(&self) -> Result<Vec<ObjectRef>> {
        (**self).list_views().await
    }

    async fn list_columns(&self, schema: Option<&str>, object: &str) -> Result<Vec<ColumnMeta>> {
        (**self).list_columns(schema, object).await
    }

    async fn execute_query(&self, sql: &str, timeout: Duration) -> Result<QueryOutput> {
        (**self).execute_query(sql, timeout).await
    }
}

/// Constructor signature for adapter registration.
pub type AdapterCtor = Box<dyn Fn(EnginePool) -> Result<Box<dyn DatabaseAdapter>> + Send + Sync>;

/// Factory creating adapters from pool handles, keyed by engine.
///
/// Engines are registered at construction; tests swap in their own
/// constructors to route a real engine key to a mock adapter.
pub struct AdapterFactory {
    ctors: HashMap<EngineType, AdapterCtor>,
}

impl AdapterFactory {
    /// Creates an empty factory with no registered engines.
    pub fn new() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// Creates a factory with the built-in Postgres and MySQL adapters.
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register(
            EngineType::Postgres,
            Box::new(|pool| match pool {
                EnginePool::Postgres(p) => Ok(Box::new(PostgresAdapter::from_pool(p)) as Box<dyn DatabaseAdapter>),
                other => Err(ScoutError::internal(format!(
                    "postgres adapter handed a {} pool",
                    other.engine()
                ))),
            }),
        );
        factory.register(
            EngineType::MySql,
            Box::new(|pool| match pool {
                EnginePool::MySql(p) => Ok(Box::new(MySqlAdapter::from_pool(p)) as Box<dyn DatabaseAdapter>),
                other => Err(ScoutError::internal(format!(
                    "mysql adapter handed a {} pool",
                    other.engine()
                ))),
            }),
        );
        factory
    }

    /// Registers (or replaces) the constructor for an engine.
    pub fn register(&mut self, engine: EngineType, ctor: AdapterCtor) {
        self.ctors.insert(engine, ctor);
    }

    /// Creates an adapter for the given engine over the given pool handle.
    pub fn create(&self, engine: EngineType, pool: EnginePool) -> Result<Box<dyn DatabaseAdapter>> {
        match self.ctors.get(&engine) {
            Some(ctor) => ctor(pool),
            None => Err(ScoutError::configuration(format!(
                "Unsupported database engine '{engine}'"
            ))
            .with_suggestion("Supported engines: postgresql, mysql")),
        }
    }
}

impl Default for AdapterFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}
