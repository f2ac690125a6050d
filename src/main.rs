//! db-scout - a read-only SQL exploration service with an HTTP API.

mod cli;

use cli::Cli;
use dbscout::adapter::AdapterFactory;
use dbscout::api::{self, AppState};
use dbscout::config::Config;
use dbscout::llm::NlQueryService;
use dbscout::pool::PoolManager;
use dbscout::service::{startup, DatabaseService, QueryService};
use dbscout::store::MetaStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_args();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);

    let store = Arc::new(match &config.state_db_path {
        Some(path) => MetaStore::open(path).await?,
        None => MetaStore::open_default().await?,
    });

    let query_timeout = Duration::from_secs(config.query.timeout_secs);
    let pools = Arc::new(PoolManager::new(query_timeout));
    let adapters = Arc::new(AdapterFactory::with_defaults());

    let databases = Arc::new(DatabaseService::new(
        store.clone(),
        pools.clone(),
        adapters,
    ));
    let queries = Arc::new(QueryService::new(
        store.clone(),
        databases.clone(),
        config.query.max_results,
        query_timeout,
    ));
    let llm_client = dbscout::llm::build_client(&config.llm)?;
    let nl_queries = Arc::new(NlQueryService::new(
        llm_client,
        databases.clone(),
        queries.clone(),
    ));

    match startup::check_stored_connections(&databases).await {
        Ok(report) => {
            info!(
                total = report.total,
                invalid = report.invalid.len(),
                "checked stored connections"
            );
        }
        Err(e) => warn!("startup connection check failed: {e}"),
    }

    let state = AppState {
        databases,
        queries,
        nl_queries,
        pools: pools.clone(),
        store: store.clone(),
    };
    api::serve(state, &config).await?;

    pools.close_all().await;
    store.close().await;
    info!("db-scout stopped");
    Ok(())
}
