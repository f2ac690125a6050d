//! Request handlers.

use crate::api::envelope::{ApiFailure, ApiResponse};
use crate::api::AppState;
use crate::store::{NewConnection, UpdateConnection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

type Handled<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

pub async fn root() -> Json<ApiResponse<ServiceInfo>> {
    ApiResponse::ok(
        "db-scout",
        ServiceInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

pub async fn health() -> Json<ApiResponse<()>> {
    ApiResponse::ok_empty("ok")
}

// Connections

pub async fn register_connection(
    State(state): State<AppState>,
    Json(new): Json<NewConnection>,
) -> Handled<crate::store::StoredConnection> {
    let created = state.databases.register(new).await?;
    Ok(ApiResponse::ok("Connection registered", created))
}

pub async fn list_connections(
    State(state): State<AppState>,
) -> Handled<Vec<crate::store::StoredConnection>> {
    let connections = state.databases.list().await?;
    Ok(ApiResponse::ok("Connections", connections))
}

pub async fn get_connection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Handled<crate::store::StoredConnection> {
    let conn = state.databases.get(id).await?;
    Ok(ApiResponse::ok("Connection", conn))
}

pub async fn update_connection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<UpdateConnection>,
) -> Handled<crate::store::StoredConnection> {
    let updated = state.databases.update(id, changes).await?;
    Ok(ApiResponse::ok("Connection updated", updated))
}

pub async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Handled<()> {
    state.databases.delete(id).await?;
    Ok(ApiResponse::ok_empty("Connection deleted"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    reachable: bool,
}

pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Handled<TestResult> {
    let reachable = state.databases.test_connection(id).await?;
    Ok(ApiResponse::ok("Connection test", TestResult { reachable }))
}

// Metadata

pub async fn list_metadata(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Handled<Vec<crate::store::MetadataRow>> {
    let rows = state.databases.list_metadata(id).await?;
    Ok(ApiResponse::ok("Metadata", rows))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    objects: usize,
}

pub async fn refresh_metadata(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Handled<RefreshResult> {
    let objects = state.databases.refresh_metadata(id).await?;
    Ok(ApiResponse::ok("Metadata refreshed", RefreshResult { objects }))
}

// Queries

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub connection_name: String,
    pub sql: String,
}

pub async fn execute_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Handled<crate::adapter::QueryOutput> {
    let output = state
        .queries
        .execute(&request.connection_name, &request.sql)
        .await?;
    Ok(ApiResponse::ok("Query executed", output))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NlQueryRequest {
    pub connection_name: String,
    pub question: String,
}

pub async fn execute_nl_query(
    State(state): State<AppState>,
    Json(request): Json<NlQueryRequest>,
) -> Handled<crate::llm::service::NlAnswer> {
    let answer = state
        .nl_queries
        .ask(&request.connection_name, &request.question)
        .await?;
    Ok(ApiResponse::ok("Question answered", answer))
}

// Observability

#[derive(Deserialize)]
pub struct ExecutionsQuery {
    #[serde(default = "default_execution_limit")]
    pub limit: i64,
}

fn default_execution_limit() -> i64 {
    50
}

pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ExecutionsQuery>,
) -> Handled<Vec<crate::store::ExecutionRecord>> {
    let entries = state.store.list_executions(query.limit.clamp(1, 500)).await?;
    Ok(ApiResponse::ok("Executions", entries))
}

pub async fn pool_status(
    State(state): State<AppState>,
) -> Handled<std::collections::HashMap<String, crate::pool::PoolStatus>> {
    let status = state.pools.status().await;
    Ok(ApiResponse::ok("Pools", status))
}
