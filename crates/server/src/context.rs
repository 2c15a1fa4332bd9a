//! Process-wide resources, owned explicitly.
//!
//! One `AppContext` is built in `main` and passed by reference to the
//! bootstrap sequence and everything downstream. The cache store opens lazily
//! and at most once; teardown closes the database first, then the cache.

use cachegate_client::{ConnectionSettings, DatabaseConnector, MongoConnectionManager};
use cachegate_core::{AppConfig, CacheDb};
use tokio::sync::{Mutex, MutexGuard, OnceCell};

pub struct AppContext {
    config: AppConfig,
    cache: OnceCell<CacheDb>,
    database: Mutex<Box<dyn DatabaseConnector>>,
}

impl AppContext {
    pub fn new(config: AppConfig, database: Box<dyn DatabaseConnector>) -> Self {
        Self { config, cache: OnceCell::new(), database: Mutex::new(database) }
    }

    /// Context backed by the MongoDB connection manager.
    pub fn from_config(config: AppConfig) -> Self {
        let database = MongoConnectionManager::new(ConnectionSettings::from_config(&config));
        Self::new(config, Box::new(database))
    }

    #[cfg(test)]
    pub fn with_cache(config: AppConfig, cache: CacheDb, database: Box<dyn DatabaseConnector>) -> Self {
        Self { config, cache: OnceCell::new_with(Some(cache)), database: Mutex::new(database) }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the cache store on first use; later calls return the same handle.
    pub async fn cache(&self) -> Result<&CacheDb, cachegate_core::Error> {
        self.cache
            .get_or_try_init(|| async {
                let cache = CacheDb::open(&self.config.cache_path).await?;
                tracing::info!(path = %self.config.cache_path.display(), "cache store opened");
                Ok(cache)
            })
            .await
    }

    pub async fn database(&self) -> MutexGuard<'_, Box<dyn DatabaseConnector>> {
        self.database.lock().await
    }

    /// Best-effort teardown of the database connection and cache store.
    pub async fn shutdown(&self) {
        self.database.lock().await.close().await;

        if let Some(cache) = self.cache.get() {
            match cache.close().await {
                Ok(()) => tracing::info!("cache store closed"),
                Err(e) => tracing::warn!(error = %e, "failed to close cache store"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachegate_client::ConnectionState;

    fn config_at(path: std::path::PathBuf) -> AppConfig {
        AppConfig { cache_path: path, ..Default::default() }
    }

    #[tokio::test]
    async fn test_cache_initialized_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::from_config(config_at(dir.path().join("cache.sqlite")));

        let first = ctx.cache().await.unwrap();
        let second = ctx.cache().await.unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[tokio::test]
    async fn test_cache_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::from_config(config_at(dir.path().join("missing").join("cache.sqlite")));

        assert!(ctx.cache().await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_closes_resources() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let ctx = AppContext::with_cache(
            AppConfig::default(),
            cache.clone(),
            Box::new(MongoConnectionManager::new(ConnectionSettings::from_config(&AppConfig::default()))),
        );

        ctx.shutdown().await;

        assert_eq!(ctx.database().await.state(), ConnectionState::Disconnected);
        assert!(cache.count().await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_without_cache() {
        let ctx = AppContext::from_config(AppConfig::default());
        ctx.shutdown().await;
        assert!(ctx.cache.get().is_none());
    }
}
