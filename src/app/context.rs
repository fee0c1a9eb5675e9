use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{Result, RoostError};
use crate::bridge::PersistenceBridge;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::refresh::Refresher;
use crate::registry::Registry;
use crate::store::SqliteStore;

pub struct AppContext {
    pub registry: Arc<Registry>,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub refresher: Refresher,
    pub bridge: PersistenceBridge,
}

impl AppContext {
    /// Wire up the full stack. Must be called inside a tokio runtime: the
    /// persistence bridge spawns its consumer task here.
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = match &config.db_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::build(store, config)
    }

    /// Everything in memory, for tests and ephemeral runs.
    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::build(store, &Config::default())
    }

    fn build(store: Arc<SqliteStore>, config: &Config) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs);
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_timeout(fetch_timeout)?);
        let refresher = Refresher::with_limits(
            registry.clone(),
            fetcher.clone(),
            config.workers,
            fetch_timeout,
        );
        let bridge = PersistenceBridge::spawn(store.clone(), config.push_queue_capacity);

        Ok(Self {
            registry,
            store,
            fetcher,
            refresher,
            bridge,
        })
    }

    /// Drain the push queue and stop the bridge consumer.
    pub async fn shutdown(self) {
        self.bridge.close().await;
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| RoostError::Config("Could not find data directory".into()))?;
        let roost_dir = data_dir.join("roost");
        std::fs::create_dir_all(&roost_dir)?;
        Ok(roost_dir.join("roost.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;
    use crate::domain::StatusMap;

    #[tokio::test]
    async fn test_shutdown_drains_queued_push() {
        let ctx = AppContext::in_memory().unwrap();
        ctx.registry
            .add_or_update("alice", "https://a.example/twtxt.txt", None, StatusMap::new())
            .unwrap();
        ctx.bridge.push(&ctx.registry).unwrap();

        // A push enqueued just before exit must land in the store.
        let store = ctx.store.clone();
        ctx.shutdown().await;

        let fresh = Registry::new();
        assert_eq!(bridge::pull(store.as_ref(), &fresh).unwrap(), 1);
        assert!(fresh.contains("https://a.example/twtxt.txt").unwrap());
    }
}
