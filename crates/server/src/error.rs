//! Structured errors for the bootstrap sequence.
//!
//! Every variant is fatal: the entry point logs it and exits with status 1.

use cachegate_core::RequiredReason;

/// Reasons the bootstrap sequence aborts.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The cache store could not be opened or reset.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(#[source] cachegate_core::Error),

    /// Content is missing from the cache and the database cannot be reached.
    #[error("DATABASE_UNREACHABLE: site {site_id} needs the database ({reason}) but it is unreachable")]
    DatabaseUnreachable { site_id: String, reason: RequiredReason },

    /// The database was reachable but the connection could not be established.
    #[error("CONNECTION_FAILED: site {site_id} needs the database but connecting failed")]
    ConnectionFailed { site_id: String },
}
