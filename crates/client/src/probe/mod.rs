//! Transport-level reachability probe.
//!
//! ### Contract
//! - No URI: report unreachable without touching the network.
//! - Otherwise open a bare TCP connection to the first host of the URI. For
//!   `mongodb+srv://` that host comes from the SRV lookup.
//! - No protocol handshake or authentication; the socket is dropped at once.
//!
//! ### Single resolution
//! The connect attempt and the timeout timer run as separate tasks and race
//! to resolve one [`Resolver`]. Exactly one of {connected, failed, timed out}
//! is observed per probe.

pub mod endpoint;
pub mod resolver;

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

pub use endpoint::{DEFAULT_PORT, Endpoint, EndpointError, parse_endpoint, resolve_srv, uses_srv};
pub use resolver::Resolver;

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected,
    TimedOut,
    Failed(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Connected)
    }
}

/// Reachability check used by the bootstrap sequence.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the endpoint behind `uri` accepts connections.
    async fn probe(&self, uri: Option<&str>) -> bool;
}

/// Probe that opens a raw TCP connection with a fixed timeout.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self { timeout: Duration::from_millis(3_000) }
    }
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Race a connect attempt against the timeout.
    pub async fn probe_endpoint(&self, endpoint: &Endpoint) -> ProbeOutcome {
        self.race(connect(endpoint.authority())).await
    }

    /// Resolve an SRV name and connect to the first published host, with the
    /// lookup counted against the same timeout.
    pub async fn probe_srv(&self, uri: &str) -> ProbeOutcome {
        let uri = uri.to_string();
        self.race(async move {
            match resolve_srv(&uri).await {
                Ok(endpoint) => {
                    tracing::debug!(%endpoint, "SRV record resolved");
                    connect(endpoint.authority()).await
                }
                Err(e) => ProbeOutcome::Failed(e.to_string()),
            }
        })
        .await
    }

    async fn race<F>(&self, attempt: F) -> ProbeOutcome
    where
        F: Future<Output = ProbeOutcome> + Send + 'static,
    {
        let (resolver, outcome) = Resolver::new();

        let attempt = {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                resolver.resolve(attempt.await);
            })
        };

        let timer = {
            let resolver = resolver.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                resolver.resolve(ProbeOutcome::TimedOut);
            })
        };

        let result = outcome
            .await
            .unwrap_or_else(|_| ProbeOutcome::Failed("probe task ended without an outcome".to_string()));

        attempt.abort();
        timer.abort();

        result
    }
}

async fn connect(authority: String) -> ProbeOutcome {
    match TcpStream::connect(authority).await {
        Ok(_stream) => ProbeOutcome::Connected,
        Err(e) => ProbeOutcome::Failed(e.to_string()),
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, uri: Option<&str>) -> bool {
        let Some(uri) = uri else {
            tracing::debug!("no database URI configured; skipping reachability probe");
            return false;
        };

        let endpoint = match parse_endpoint(uri) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(error = %e, "cannot probe database URI");
                return false;
            }
        };

        let outcome = if uses_srv(uri) { self.probe_srv(uri).await } else { self.probe_endpoint(&endpoint).await };
        match &outcome {
            ProbeOutcome::Connected => tracing::debug!(%endpoint, "database endpoint reachable"),
            ProbeOutcome::TimedOut => {
                tracing::warn!(%endpoint, timeout_ms = self.timeout.as_millis() as u64, "database probe timed out");
            }
            ProbeOutcome::Failed(reason) => tracing::warn!(%endpoint, %reason, "database probe failed"),
        }

        outcome.is_reachable()
    }
}
