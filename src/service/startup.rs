//! Boot-time connection checks.
//!
//! Loads the stored connections and validates their basic integrity before
//! the server starts accepting requests. Invalid records are reported, not
//! fatal: one bad URL must not keep every other connection offline.

use crate::error::Result;
use crate::service::database::{validate_connection_url, DatabaseService};
use tracing::{info, warn};

/// Outcome of the boot-time connection sweep.
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    /// Stored connections found.
    pub total: usize,
    /// Names of connections whose URL no longer validates.
    pub invalid: Vec<String>,
}

/// Validates every stored connection record.
pub async fn check_stored_connections(databases: &DatabaseService) -> Result<StartupReport> {
    let connections = databases.list().await?;
    let mut report = StartupReport {
        total: connections.len(),
        invalid: Vec::new(),
    };

    for conn in &connections {
        if let Err(e) = validate_connection_url(&conn.url) {
            warn!(connection = %conn.name, "stored connection failed validation: {e}");
            report.invalid.push(conn.name.clone());
        }
    }

    info!(
        total = report.total,
        invalid = report.invalid.len(),
        "startup connection check complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterFactory;
    use crate::pool::PoolManager;
    use crate::store::{MetaStore, NewConnection};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reports_invalid_urls() {
        let store = Arc::new(MetaStore::open_in_memory().await.unwrap());
        // Insert directly so URL validation at registration is bypassed,
        // mimicking a record that predates a rule change.
        store
            .insert_connection(&NewConnection {
                name: "good".to_string(),
                url: "postgresql://u:p@localhost:5432/app".to_string(),
                description: None,
                is_active: true,
            })
            .await
            .unwrap();
        store
            .insert_connection(&NewConnection {
                name: "bad".to_string(),
                url: "oracle://legacy/app".to_string(),
                description: None,
                is_active: true,
            })
            .await
            .unwrap();

        let databases = DatabaseService::new(
            store,
            Arc::new(PoolManager::new(Duration::from_secs(30))),
            Arc::new(AdapterFactory::with_defaults()),
        );

        let report = check_stored_connections(&databases).await.unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.invalid, vec!["bad".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let databases = DatabaseService::new(
            Arc::new(MetaStore::open_in_memory().await.unwrap()),
            Arc::new(PoolManager::new(Duration::from_secs(30))),
            Arc::new(AdapterFactory::with_defaults()),
        );

        let report = check_stored_connections(&databases).await.unwrap();
        assert_eq!(report.total, 0);
        assert!(report.invalid.is_empty());
    }
}
