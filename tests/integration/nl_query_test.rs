//! Integration tests for the natural-language query path.

use dbscout::adapter::{AdapterFactory, ColumnMeta, MockAdapter, ObjectRef, ObjectType};
use dbscout::engine::EngineType;
use dbscout::llm::{MockLlmClient, NlQueryService};
use dbscout::pool::PoolManager;
use dbscout::service::{DatabaseService, QueryService};
use dbscout::store::{ExecutionStatus, MetaStore, NewConnection};
use std::sync::Arc;
use std::time::Duration;

fn orders_table() -> (ObjectRef, Vec<ColumnMeta>) {
    (
        ObjectRef {
            schema: Some("public".to_string()),
            name: "orders".to_string(),
            object_type: ObjectType::Table,
        },
        vec![ColumnMeta {
            name: "total".to_string(),
            data_type: "numeric".to_string(),
            is_nullable: false,
            is_primary_key: false,
            default_value: None,
        }],
    )
}

async fn setup(
    llm: MockLlmClient,
) -> (NlQueryService, Arc<MetaStore>, Arc<MockAdapter>, Arc<MockLlmClient>) {
    let store = Arc::new(MetaStore::open_in_memory().await.unwrap());
    let pools = Arc::new(PoolManager::new(Duration::from_secs(30)));
    let mock = Arc::new(MockAdapter::with_objects(vec![orders_table()]));
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
            name: "shop".to_string(),
            url: "postgresql://u:p@localhost:5432/shop".to_string(),
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
    let llm = Arc::new(llm);
    let service = NlQueryService::new(Box::new(llm.clone()), databases, queries);
    (service, store, mock, llm)
}

#[tokio::test]
async fn test_question_flows_through_validator_and_log() {
    let llm = MockLlmClient::with_responses(vec![
        "```sql\nSELECT SUM(total) FROM orders\n```".to_string(),
    ]);
    let (service, store, adapter, _) = setup(llm).await;

    let answer = service.ask("shop", "what is the total revenue?").await.unwrap();
    assert_eq!(answer.generated_sql, "SELECT SUM(total) FROM orders");
    assert_eq!(
        adapter.executed_queries(),
        vec!["SELECT SUM(total) FROM orders LIMIT 1000".to_string()]
    );

    let log = store.list_executions(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, ExecutionStatus::Success);
    assert_eq!(log[0].input_sql, "what is the total revenue?");
    assert_eq!(
        log[0].generated_sql.as_deref(),
        Some("SELECT SUM(total) FROM orders")
    );
}

#[tokio::test]
async fn test_prompt_carries_cached_schema() {
    let llm = MockLlmClient::with_responses(vec![
        "```sql\nSELECT total FROM orders\n```".to_string(),
    ]);
    let (service, _, _, llm) = setup(llm).await;

    service.ask("shop", "show order totals").await.unwrap();

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    let system = &requests[0][0].content;
    assert!(system.contains("public.orders"));
    assert!(system.contains("total numeric"));
}

#[tokio::test]
async fn test_rejected_generation_is_logged_as_error() {
    let llm = MockLlmClient::with_responses(vec![
        "```sql\nTRUNCATE orders\n```".to_string(),
    ]);
    let (service, store, adapter, _) = setup(llm).await;

    service.ask("shop", "wipe the orders").await.unwrap_err();
    assert!(adapter.executed_queries().is_empty());

    let log = store.list_executions(10).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, ExecutionStatus::Error);
}
