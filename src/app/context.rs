use std::sync::Arc;

use tracing::info;

use crate::app::error::Result;
use crate::config::{Config, StorageKind};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::{Fetcher, SourceFetcher};
use crate::query::QueryService;
use crate::registry::SourceRegistry;
use crate::retention::RetentionManager;
use crate::scheduler::Scheduler;
use crate::store::{MemoryStore, SqliteStore, Store};

pub struct AppContext {
    pub store: Arc<dyn Store>,
    pub registry: Arc<SourceRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub retention: Arc<RetentionManager>,
    pub query: QueryService,
}

impl AppContext {
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn Store> = match config.settings.storage {
            StorageKind::Sqlite => {
                let path = config.database_path()?;
                info!("Using database {}", path.display());
                Arc::new(SqliteStore::new(&path)?)
            }
            StorageKind::Memory => Arc::new(MemoryStore::new()),
        };
        let transport: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::new(config.settings.fetch_timeout)?);

        Ok(Self::with_parts(config, store, transport))
    }

    /// Wire the components around an existing store and transport.
    pub fn with_parts(
        config: &Config,
        store: Arc<dyn Store>,
        transport: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        let settings = &config.settings;
        let registry = Arc::new(SourceRegistry::from_groups(&config.groups));

        let fetcher = ParallelFetcher::with_workers(
            SourceFetcher::new(transport, settings.fetch_timeout),
            settings.concurrency(),
        );
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            registry.clone(),
            fetcher,
            settings.update_interval,
        ));
        let retention = Arc::new(RetentionManager::new(
            store.clone(),
            registry.clone(),
            settings.retention_days,
            settings.retention_items,
            settings.cleanup_interval,
        ));
        let query = QueryService::new(
            store.clone(),
            registry.clone(),
            settings.default_page_size,
            settings.max_page_size,
        );

        Self {
            store,
            registry,
            scheduler,
            retention,
            query,
        }
    }
}
