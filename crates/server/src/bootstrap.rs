//! Bootstrap orchestrator.
//!
//! Sequences cache initialization, the reachability probe, the availability
//! decision and the optional database connect, then hands the connectivity
//! flag to the render root.
//!
//! ### Outcomes
//! | cache      | reachable | result                              |
//! |------------|-----------|-------------------------------------|
//! | sufficient | no        | degraded, flag false                |
//! | sufficient | yes       | ready without connecting, flag false |
//! | required   | no        | abort                               |
//! | required   | yes       | connect; ready (flag true) or abort |
//!
//! Nothing here exits the process. Aborts come back as [`BootstrapError`]
//! and `main` decides the exit status.

use cachegate_client::ReachabilityProbe;
use cachegate_core::{Availability, check_availability};

use crate::context::AppContext;
use crate::error::BootstrapError;
use crate::render::{ConnectivityProvider, RenderRoot};

/// States visited by a bootstrap run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Init,
    CacheReady,
    ReachabilityChecked,
    AvailabilityDecided,
    DegradedNoDb,
    Connecting,
    Ready,
    Running,
    Aborted,
}

/// What a successful run observed.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub trail: Vec<BootstrapState>,
    pub cleared_entries: Option<u64>,
    pub reachable: bool,
    pub availability: Availability,
}

/// Result of a successful run: the injected root plus the report.
#[derive(Debug)]
pub struct Launch {
    pub root: RenderRoot,
    pub report: BootstrapReport,
}

pub struct Bootstrap<'a> {
    ctx: &'a AppContext,
    probe: &'a dyn ReachabilityProbe,
    trail: Vec<BootstrapState>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(ctx: &'a AppContext, probe: &'a dyn ReachabilityProbe) -> Self {
        Self { ctx, probe, trail: vec![BootstrapState::Init] }
    }

    fn enter(&mut self, state: BootstrapState) {
        tracing::debug!(?state, "bootstrap transition");
        self.trail.push(state);
    }

    fn abort(&mut self, error: BootstrapError) -> BootstrapError {
        self.trail.push(BootstrapState::Aborted);
        tracing::error!(error = %error, trail = ?self.trail, "bootstrap aborted");
        error
    }

    pub async fn run(mut self) -> Result<Launch, BootstrapError> {
        let ctx = self.ctx;
        let config = ctx.config();
        let site_id = config.site_id.as_str();

        let cache = match ctx.cache().await {
            Ok(cache) => cache,
            Err(e) => return Err(self.abort(BootstrapError::CacheUnavailable(e))),
        };
        self.enter(BootstrapState::CacheReady);

        let cleared_entries = if config.reset_cache {
            match cache.clear().await {
                Ok(count) => {
                    tracing::info!(cleared = count, "cache reset before bootstrap");
                    Some(count)
                }
                Err(e) => return Err(self.abort(BootstrapError::CacheUnavailable(e))),
            }
        } else {
            None
        };

        let reachable = self.probe.probe(config.database_uri()).await;
        self.enter(BootstrapState::ReachabilityChecked);

        let availability = check_availability(cache, site_id).await;
        self.enter(BootstrapState::AvailabilityDecided);

        let connected = match (&availability, reachable) {
            (Availability::CacheSufficient, false) => {
                self.enter(BootstrapState::DegradedNoDb);
                tracing::warn!(site_id, "database unreachable; serving from cache only");
                false
            }
            (Availability::CacheSufficient, true) => {
                self.enter(BootstrapState::Ready);
                tracing::info!(site_id, "cache holds all content; skipping database connection");
                false
            }
            (Availability::DatabaseRequired(reason), false) => {
                let error =
                    BootstrapError::DatabaseUnreachable { site_id: site_id.to_string(), reason: reason.clone() };
                return Err(self.abort(error));
            }
            (Availability::DatabaseRequired(_), true) => {
                self.enter(BootstrapState::Connecting);
                if !ctx.database().await.connect().await {
                    return Err(self.abort(BootstrapError::ConnectionFailed { site_id: site_id.to_string() }));
                }
                self.enter(BootstrapState::Ready);
                true
            }
        };

        let connectivity = ConnectivityProvider::from_flag(connected);
        let root = RenderRoot::new(config.site_id.clone(), cache.clone(), connectivity);
        self.enter(BootstrapState::Running);

        Ok(Launch {
            root,
            report: BootstrapReport { trail: self.trail, cleared_entries, reachable, availability },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use cachegate_client::{ConnectionState, DatabaseConnector};
    use cachegate_core::cache::keys::{page_key, site_content_key, site_key};
    use cachegate_core::{AppConfig, CacheDb, RequiredReason};
    use serde_json::json;

    use BootstrapState::*;

    struct StaticProbe(bool);

    #[async_trait]
    impl ReachabilityProbe for StaticProbe {
        async fn probe(&self, _uri: Option<&str>) -> bool {
            self.0
        }
    }

    struct FakeConnector {
        succeed: bool,
        attempts: Arc<AtomicUsize>,
        state: ConnectionState,
    }

    #[async_trait]
    impl DatabaseConnector for FakeConnector {
        async fn connect(&mut self) -> bool {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                self.state = ConnectionState::Connected;
            }
            self.succeed
        }

        async fn close(&mut self) {
            self.state = ConnectionState::Disconnected;
        }

        fn state(&self) -> ConnectionState {
            self.state
        }
    }

    struct HangingConnector {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DatabaseConnector for HangingConnector {
        async fn connect(&mut self) -> bool {
            std::future::pending().await
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }

        fn state(&self) -> ConnectionState {
            ConnectionState::Connecting
        }
    }

    struct Harness {
        ctx: AppContext,
        cache: CacheDb,
        attempts: Arc<AtomicUsize>,
    }

    async fn harness(reset_cache: bool, connect_succeeds: bool) -> Harness {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = FakeConnector {
            succeed: connect_succeeds,
            attempts: Arc::clone(&attempts),
            state: ConnectionState::Disconnected,
        };
        let config = AppConfig {
            site_id: "docs".into(),
            mongodb_uri: Some("mongodb://127.0.0.1:27017".into()),
            reset_cache,
            ..Default::default()
        };
        let ctx = AppContext::with_cache(config, cache.clone(), Box::new(connector));
        Harness { ctx, cache, attempts }
    }

    async fn seed_complete_site(cache: &CacheDb) {
        cache.put_value(&site_key("docs"), &json!({"pageOrder": ["home"]})).await.unwrap();
        cache.put_value(&page_key("home"), &json!({"data": {"blocks": []}})).await.unwrap();
    }

    #[tokio::test]
    async fn test_sufficient_and_unreachable_degrades() {
        let h = harness(false, true).await;
        seed_complete_site(&h.cache).await;

        let launch = Bootstrap::new(&h.ctx, &StaticProbe(false)).run().await.unwrap();

        assert_eq!(
            launch.report.trail,
            vec![Init, CacheReady, ReachabilityChecked, AvailabilityDecided, DegradedNoDb, Running]
        );
        assert!(!launch.root.db_connected().await);
        assert_eq!(h.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sufficient_and_reachable_skips_connect() {
        let h = harness(false, true).await;
        h.cache.put_value(&site_content_key("docs"), &json!({})).await.unwrap();

        let launch = Bootstrap::new(&h.ctx, &StaticProbe(true)).run().await.unwrap();

        assert_eq!(
            launch.report.trail,
            vec![Init, CacheReady, ReachabilityChecked, AvailabilityDecided, Ready, Running]
        );
        assert!(launch.report.reachable);
        assert!(!launch.root.db_connected().await);
        assert_eq!(h.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_required_and_unreachable_aborts_without_mutation() {
        let h = harness(false, true).await;
        h.cache.put_value(&site_key("docs"), &json!({"pageOrder": ["home"]})).await.unwrap();
        let before = h.cache.count().await.unwrap();

        let result = Bootstrap::new(&h.ctx, &StaticProbe(false)).run().await;

        assert!(matches!(
            result,
            Err(BootstrapError::DatabaseUnreachable { ref site_id, reason: RequiredReason::PagesMissing { .. } })
                if site_id == "docs"
        ));
        assert_eq!(h.cache.count().await.unwrap(), before);
        assert_eq!(h.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_is_the_only_mutation_before_abort() {
        let h = harness(true, true).await;
        seed_complete_site(&h.cache).await;

        let result = Bootstrap::new(&h.ctx, &StaticProbe(false)).run().await;

        // the reset emptied the cache, so the site now needs the database
        assert!(matches!(
            result,
            Err(BootstrapError::DatabaseUnreachable { reason: RequiredReason::SiteMissing, .. })
        ));
        assert_eq!(h.cache.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_required_and_reachable_connects() {
        let h = harness(false, true).await;

        let launch = Bootstrap::new(&h.ctx, &StaticProbe(true)).run().await.unwrap();

        assert_eq!(
            launch.report.trail,
            vec![Init, CacheReady, ReachabilityChecked, AvailabilityDecided, Connecting, Ready, Running]
        );
        assert!(launch.root.db_connected().await);
        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);
        assert!(h.ctx.database().await.is_connected());
    }

    #[tokio::test]
    async fn test_required_and_connect_failure_aborts() {
        let h = harness(false, false).await;

        let result = Bootstrap::new(&h.ctx, &StaticProbe(true)).run().await;

        assert!(matches!(result, Err(BootstrapError::ConnectionFailed { .. })));
        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_reported() {
        let h = harness(true, true).await;
        h.cache.put_value("page:stale", &json!({"data": 1})).await.unwrap();

        let launch = Bootstrap::new(&h.ctx, &StaticProbe(true)).run().await.unwrap();

        assert_eq!(launch.report.cleared_entries, Some(1));
        assert!(launch.root.db_connected().await);
    }

    #[tokio::test]
    async fn test_interrupted_connect_still_tears_down() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let closed = Arc::new(AtomicUsize::new(0));
        let config = AppConfig {
            site_id: "docs".into(),
            mongodb_uri: Some("mongodb://127.0.0.1:27017".into()),
            ..Default::default()
        };
        let connector = HangingConnector { closed: Arc::clone(&closed) };
        let ctx = AppContext::with_cache(config, cache.clone(), Box::new(connector));

        let interrupt = tokio::time::sleep(std::time::Duration::from_millis(50));
        let outcome =
            crate::shutdown::unless_interrupted(Bootstrap::new(&ctx, &StaticProbe(true)).run(), interrupt).await;
        assert!(outcome.is_none());

        ctx.shutdown().await;
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(cache.count().await.is_err());
    }

    #[tokio::test]
    async fn test_cache_unavailable_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { cache_path: dir.path().join("missing").join("cache.sqlite"), ..Default::default() };
        let ctx = AppContext::from_config(config);

        let result = Bootstrap::new(&ctx, &StaticProbe(true)).run().await;

        assert!(matches!(result, Err(BootstrapError::CacheUnavailable(_))));
    }
}
