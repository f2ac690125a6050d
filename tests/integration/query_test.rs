//! Integration tests for the query pipeline.

use dbscout::adapter::{AdapterFactory, ColumnInfo, MockAdapter, QueryOutput, Value};
use dbscout::engine::EngineType;
use dbscout::error::ErrorCategory;
use dbscout::pool::PoolManager;
use dbscout::service::{DatabaseService, QueryService};
use dbscout::store::{ExecutionStatus, MetaStore, NewConnection};
use std::sync::Arc;
use std::time::Duration;

async fn setup() -> (Arc<QueryService>, Arc<DatabaseService>, Arc<MetaStore>, Arc<MockAdapter>) {
    let store = Arc::new(MetaStore::open_in_memory().await.unwrap());
    let pools = Arc::new(PoolManager::new(Duration::from_secs(30)));
    let mock = Arc::new(
        MockAdapter::new().with_result(QueryOutput::with_data(
            vec![ColumnInfo::new("user_id", "int8"), ColumnInfo::new("email", "text")],
            vec![vec![Value::Int(1), Value::String("a@example.com".into())]],
        )),
    );
    let mut factory = AdapterFactory::new();
    let adapter = mock.clone();
    factory.register(
        EngineType::Postgres,
        Box::new(move |_| Ok(Box::new(adapter.clone()))),
    );
    let databases = Arc::new(DatabaseService::new(
        store.clone(),
        pools,
        Arc::new(factory),
    ));
    databases
        .register(NewConnection {
            name: "proj".to_string(),
            url: "postgresql://u:p@localhost:5432/proj".to_string(),
            description: None,
            is_active: true,
        })
        .await
        .unwrap();

    let queries = Arc::new(QueryService::new(
        store.clone(),
        databases.clone(),
        1000,
        Duration::from_secs(30),
    ));
    (queries, databases, store, mock)
}

#[tokio::test]
async fn test_unbounded_select_gets_row_limit() {
    let (queries, _, _, adapter) = setup().await;

    let output = queries.execute("proj", "SELECT * FROM users").await.unwrap();
    assert_eq!(output.row_count, 1);
    assert_eq!(
        adapter.executed_queries(),
        vec!["SELECT * FROM users LIMIT 1000".to_string()]
    );
}

#[tokio::test]
async fn test_existing_limit_is_preserved() {
    let (queries, _, _, adapter) = setup().await;

    queries
        .execute("proj", "SELECT * FROM users LIMIT 5")
        .await
        .unwrap();
    assert_eq!(
        adapter.executed_queries(),
        vec!["SELECT * FROM users LIMIT 5".to_string()]
    );
}

#[tokio::test]
async fn test_column_names_come_back_camel_cased() {
    let (queries, _, _, _) = setup().await;

    let output = queries.execute("proj", "SELECT 1").await.unwrap();
    let names: Vec<&str> = output.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["userId", "email"]);
}

#[tokio::test]
async fn test_destructive_sql_never_reaches_adapter() {
    let (queries, _, store, adapter) = setup().await;

    let err = queries.execute("proj", "DROP TABLE users").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert!(adapter.executed_queries().is_empty());

    // The rejection is still logged.
    let log = store.list_executions(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, ExecutionStatus::Error);
    assert_eq!(log[0].input_sql, "DROP TABLE users");
}

#[tokio::test]
async fn test_successful_execution_is_logged() {
    let (queries, _, store, _) = setup().await;

    queries.execute("proj", "SELECT * FROM users").await.unwrap();

    let log = store.list_executions(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, ExecutionStatus::Success);
    assert_eq!(
        log[0].sanitized_sql.as_deref(),
        Some("SELECT * FROM users LIMIT 1000")
    );
    assert_eq!(log[0].row_count, Some(1));
    assert!(log[0].connection_id.is_some());
}

#[tokio::test]
async fn test_unknown_connection_is_not_found() {
    let (queries, _, _, adapter) = setup().await;

    let err = queries.execute("ghost", "SELECT 1").await.unwrap_err();
    assert_eq!(err.http_status(), 404);
    assert!(adapter.executed_queries().is_empty());
}

#[tokio::test]
async fn test_delete_connection_cascades_history() {
    let (queries, databases, store, _) = setup().await;

    queries.execute("proj", "SELECT 1").await.unwrap();
    // This entry never resolves a connection; its connection_id stays NULL.
    queries.execute("ghost", "SELECT 1").await.unwrap_err();
    assert_eq!(store.list_executions(10).await.unwrap().len(), 2);

    let conn = databases.get_by_name("proj").await.unwrap();
    databases.delete(conn.id).await.unwrap();

    let log = store.list_executions(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].connection_id.is_none());
}
