//! Integration tests for metadata extraction and caching.

use dbscout::adapter::{
    AdapterFactory, ColumnMeta, FailingAdapter, MockAdapter, ObjectRef, ObjectType,
};
use dbscout::engine::EngineType;
use dbscout::error::ErrorCategory;
use dbscout::pool::PoolManager;
use dbscout::service::DatabaseService;
use dbscout::store::{MetaStore, NewConnection};
use std::sync::Arc;
use std::time::Duration;

fn users_table() -> (ObjectRef, Vec<ColumnMeta>) {
    (
        ObjectRef {
            schema: Some("public".to_string()),
            name: "users".to_string(),
            object_type: ObjectType::Table,
        },
        vec![
            ColumnMeta {
                name: "id".to_string(),
                data_type: "bigint".to_string(),
                is_nullable: false,
                is_primary_key: true,
                default_value: None,
            },
            ColumnMeta {
                name: "email".to_string(),
                data_type: "text".to_string(),
                is_nullable: true,
                is_primary_key: false,
                default_value: None,
            },
        ],
    )
}

fn active_users_view() -> (ObjectRef, Vec<ColumnMeta>) {
    (
        ObjectRef {
            schema: Some("public".to_string()),
            name: "active_users".to_string(),
            object_type: ObjectType::View,
        },
        vec![ColumnMeta {
            name: "email".to_string(),
            data_type: "text".to_string(),
            is_nullable: true,
            is_primary_key: false,
            default_value: None,
        }],
    )
}

async fn setup(adapter: Arc<dyn dbscout::adapter::DatabaseAdapter>) -> (Arc<DatabaseService>, i64) {
    let store = Arc::new(MetaStore::open_in_memory().await.unwrap());
    let pools = Arc::new(PoolManager::new(Duration::from_secs(30)));
    let mut factory = AdapterFactory::new();
    factory.register(
        EngineType::Postgres,
        Box::new(move |_| Ok(Box::new(adapter.clone()))),
    );
    let databases = Arc::new(DatabaseService::new(store, pools, Arc::new(factory)));

    let created = databases
        .register(NewConnection {
            name: "proj".to_string(),
            url: "postgresql://u:p@localhost:5432/proj".to_string(),
            description: None,
            is_active: true,
        })
        .await
        .unwrap();
    (databases, created.id)
}

#[tokio::test]
async fn test_refresh_captures_tables_and_views() {
    let adapter = Arc::new(MockAdapter::with_objects(vec![
        users_table(),
        active_users_view(),
    ]));
    let (databases, id) = setup(adapter).await;

    let count = databases.refresh_metadata(id).await.unwrap();
    assert_eq!(count, 2);

    let rows = databases.list_metadata(id).await.unwrap();
    assert_eq!(rows.len(), 2);

    let users = rows.iter().find(|r| r.object_name == "users").unwrap();
    assert_eq!(users.object_type, ObjectType::Table);
    assert_eq!(users.schema_name.as_deref(), Some("public"));
    assert_eq!(users.columns.len(), 2);
    assert!(users.columns[0].is_primary_key);

    let view = rows.iter().find(|r| r.object_name == "active_users").unwrap();
    assert_eq!(view.object_type, ObjectType::View);
}

#[tokio::test]
async fn test_refresh_replaces_previous_snapshot() {
    let adapter = Arc::new(MockAdapter::with_objects(vec![
        users_table(),
        active_users_view(),
    ]));
    let (databases, id) = setup(adapter).await;

    databases.refresh_metadata(id).await.unwrap();
    databases.refresh_metadata(id).await.unwrap();

    // Two refreshes of the same schema leave exactly one snapshot.
    assert_eq!(databases.list_metadata(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_cached_snapshot() {
    let store = Arc::new(MetaStore::open_in_memory().await.unwrap());
    let pools = Arc::new(PoolManager::new(Duration::from_secs(30)));

    let good = Arc::new(MockAdapter::with_objects(vec![users_table()]));
    let mut factory = AdapterFactory::new();
    let adapter = good.clone();
    factory.register(
        EngineType::Postgres,
        Box::new(move |_| Ok(Box::new(adapter.clone()))),
    );
    let databases = Arc::new(DatabaseService::new(
        store.clone(),
        pools.clone(),
        Arc::new(factory),
    ));
    let id = databases
        .register(NewConnection {
            name: "proj".to_string(),
            url: "postgresql://u:p@localhost:5432/proj".to_string(),
            description: None,
            is_active: true,
        })
        .await
        .unwrap()
        .id;
    databases.refresh_metadata(id).await.unwrap();

    // Same store, but the adapter now fails every listing.
    let mut failing = AdapterFactory::new();
    failing.register(
        EngineType::Postgres,
        Box::new(|_| {
            Ok(Box::new(FailingAdapter::new(
                ErrorCategory::Network,
                "connection refused",
            )))
        }),
    );
    let broken = DatabaseService::new(store, pools, Arc::new(failing));

    let err = broken.refresh_metadata(id).await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::Network);

    // The previous snapshot survives the failed refresh.
    let rows = broken.list_metadata(id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].object_name, "users");
}

#[tokio::test]
async fn test_ensure_metadata_refreshes_only_once() {
    let adapter = Arc::new(MockAdapter::with_objects(vec![users_table()]));
    let (databases, id) = setup(adapter).await;

    assert!(databases.ensure_metadata(id).await.unwrap());
    assert!(!databases.ensure_metadata(id).await.unwrap());
    assert_eq!(databases.list_metadata(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_cascades_metadata() {
    let adapter = Arc::new(MockAdapter::with_objects(vec![users_table()]));
    let (databases, id) = setup(adapter).await;

    databases.refresh_metadata(id).await.unwrap();
    databases.delete(id).await.unwrap();

    let err = databases.list_metadata(id).await.unwrap_err();
    assert_eq!(err.http_status(), 404);
}
