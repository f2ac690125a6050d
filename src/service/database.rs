//! Connection registry and metadata orchestration.
//!
//! Owns registration, update and deletion of target connections, URL
//! validation, and the metadata cache lifecycle. All target-database access
//! goes through adapters resolved from the shared pool manager.

use crate::adapter::{collect_metadata, AdapterFactory, DatabaseAdapter};
use crate::engine::{self, EngineType};
use crate::error::{Result, ScoutError};
use crate::pool::PoolManager;
use crate::store::{MetaStore, MetadataRow, NewConnection, StoredConnection, UpdateConnection};
use std::sync::Arc;
use tracing::{info, warn};

/// Service for stored connection CRUD and metadata refresh.
pub struct DatabaseService {
    store: Arc<MetaStore>,
    pools: Arc<PoolManager>,
    adapters: Arc<AdapterFactory>,
}

impl DatabaseService {
    pub fn new(store: Arc<MetaStore>, pools: Arc<PoolManager>, adapters: Arc<AdapterFactory>) -> Self {
        Self {
            store,
            pools,
            adapters,
        }
    }

    /// Registers a new target connection after validating name and URL.
    pub async fn register(&self, new: NewConnection) -> Result<StoredConnection> {
        validate_connection_url(&new.url)?;

        if self.store.connection_name_taken(&new.name, None).await? {
            return Err(ScoutError::conflict(format!(
                "Connection '{}' already exists",
                new.name
            )));
        }

        let created = self.store.insert_connection(&new).await?;
        info!(connection = %created.name, id = created.id, "registered connection");
        Ok(created)
    }

    /// Lists all stored connections.
    pub async fn list(&self) -> Result<Vec<StoredConnection>> {
        self.store.list_connections().await
    }

    /// Gets a stored connection by id, failing with not-found.
    pub async fn get(&self, id: i64) -> Result<StoredConnection> {
        self.store
            .get_connection(id)
            .await?
            .ok_or_else(|| ScoutError::not_found(format!("Connection {id} not found")))
    }

    /// Gets a stored connection by exact name, failing with not-found.
    pub async fn get_by_name(&self, name: &str) -> Result<StoredConnection> {
        self.store
            .get_connection_by_name(name)
            .await?
            .ok_or_else(|| ScoutError::not_found(format!("Connection '{name}' not found")))
    }

    /// Applies a partial update, revalidating name and URL where changed.
    ///
    /// A URL change closes the pool serving the old target so stale
    /// credentials cannot linger.
    pub async fn update(&self, id: i64, changes: UpdateConnection) -> Result<StoredConnection> {
        let current = self.get(id).await?;

        if let Some(name) = &changes.name {
            if self.store.connection_name_taken(name, Some(id)).await? {
                return Err(ScoutError::conflict(format!(
                    "Connection '{name}' already exists"
                )));
            }
        }
        if let Some(url) = &changes.url {
            validate_connection_url(url)?;
        }

        let updated = self
            .store
            .update_connection(id, &changes)
            .await?
            .ok_or_else(|| ScoutError::not_found(format!("Connection {id} not found")))?;

        if changes.url.is_some() && updated.url != current.url {
            if let Err(e) = self.pools.close_for_url(&current.url).await {
                warn!("Failed to close pool for replaced URL: {e}");
            }
        }

        Ok(updated)
    }

    /// Deletes a stored connection. Cached metadata cascades; the pool for
    /// its target is closed best-effort.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let current = self.get(id).await?;
        self.store.delete_connection(id).await?;

        if let Err(e) = self.pools.close_for_url(&current.url).await {
            warn!("Failed to close pool for deleted connection: {e}");
        }
        info!(connection = %current.name, id, "deleted connection");
        Ok(())
    }

    /// Probes a stored connection's target with a trivial query.
    pub async fn test_connection(&self, id: i64) -> Result<bool> {
        let conn = self.get(id).await?;
        let adapter = self.adapter_for(&conn).await?;
        Ok(adapter.test_connection().await)
    }

    /// Resolves the adapter for a stored connection via the shared pools.
    pub async fn adapter_for(&self, conn: &StoredConnection) -> Result<Box<dyn DatabaseAdapter>> {
        let engine = engine::detect(&conn.url);
        let pool = self.pools.get_pool(&conn.url).await?;
        self.adapters.create(engine, pool)
    }

    /// Refreshes the cached metadata snapshot for one connection.
    ///
    /// Extraction happens first; the stored snapshot is only touched once a
    /// complete new set is in hand, then swapped in a single transaction.
    /// An extraction failure therefore leaves the previous snapshot intact,
    /// never a partial mix.
    pub async fn refresh_metadata(&self, id: i64) -> Result<usize> {
        let conn = self.get(id).await?;
        let adapter = self.adapter_for(&conn).await?;

        let records = collect_metadata(adapter.as_ref()).await?;
        let written = self.store.replace_metadata(id, &records).await?;

        info!(connection = %conn.name, objects = written, "refreshed metadata");
        Ok(written)
    }

    /// Refreshes metadata only when no cached rows exist. Returns whether a
    /// refresh ran.
    pub async fn ensure_metadata(&self, id: i64) -> Result<bool> {
        // Also validates the connection id.
        self.get(id).await?;

        if self.store.count_metadata(id).await? > 0 {
            return Ok(false);
        }
        self.refresh_metadata(id).await?;
        Ok(true)
    }

    /// Lists the cached metadata snapshot for one connection.
    pub async fn list_metadata(&self, id: i64) -> Result<Vec<MetadataRow>> {
        self.get(id).await?;
        self.store.list_metadata(id).await
    }
}

/// Validates a connection URL: supported scheme, non-empty host, non-empty
/// database path, port in 1-65535 when present.
pub fn validate_connection_url(url: &str) -> Result<()> {
    let engine_type = engine::detect(url);
    if engine_type == EngineType::Unknown {
        return Err(ScoutError::validation(
            "Connection URL scheme is not supported",
        )
        .with_suggestion("Supported engines: postgresql, mysql"));
    }

    let parsed = url::Url::parse(&engine::normalize(url))
        .map_err(|e| ScoutError::validation(format!("Invalid connection URL: {e}")))?;

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ScoutError::validation("Connection URL must include a host"));
    }
    if parsed.path().trim_start_matches('/').is_empty() {
        return Err(ScoutError::validation(
            "Connection URL must include a database name",
        ));
    }
    if parsed.port() == Some(0) {
        return Err(ScoutError::validation(
            "Connection URL port must be between 1 and 65535",
        ));
    }

    Ok(())
}
