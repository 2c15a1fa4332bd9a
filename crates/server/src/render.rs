//! Composition root handed to the rendering layer.
//!
//! The renderer never sees the bootstrap internals. It receives the cache
//! handle and an asynchronous provider telling it whether a live database
//! connection backs this process. The flag is advisory: the cache may hold
//! everything a page needs even when it resolves to false.

use std::sync::Arc;

use cachegate_core::CacheDb;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

type ProviderFn = dyn Fn() -> BoxFuture<'static, bool> + Send + Sync;

/// Async factory resolving to the connectivity flag.
#[derive(Clone)]
pub struct ConnectivityProvider {
    factory: Arc<ProviderFn>,
}

impl ConnectivityProvider {
    /// Provider for a flag computed once at startup.
    pub fn from_flag(connected: bool) -> Self {
        Self { factory: Arc::new(move || async move { connected }.boxed()) }
    }

    pub async fn resolve(&self) -> bool {
        (self.factory)().await
    }
}

impl std::fmt::Debug for ConnectivityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityProvider").finish_non_exhaustive()
    }
}

/// Everything the renderer is injected with.
#[derive(Debug, Clone)]
pub struct RenderRoot {
    site_id: String,
    cache: CacheDb,
    connectivity: ConnectivityProvider,
}

impl RenderRoot {
    pub fn new(site_id: String, cache: CacheDb, connectivity: ConnectivityProvider) -> Self {
        Self { site_id, cache, connectivity }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// Whether a live database connection backs this process.
    pub async fn db_connected(&self) -> bool {
        self.connectivity.resolve().await
    }
}
