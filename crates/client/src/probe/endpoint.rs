//! Connection-string endpoint extraction.
//!
//! Pulls the first host and port out of a `mongodb://` or `mongodb+srv://`
//! URI so it can be probed at the transport level.
//!
//! Handles credentials, comma-separated seed lists, bracketed IPv6 literals,
//! and trailing paths or options. A `mongodb+srv://` name is not itself a
//! server; [`resolve_srv`] looks up the seed list it publishes.

use std::fmt;

use cachegate_core::config::SUPPORTED_SCHEMES;
use mongodb::options::{ClientOptions, ServerAddress};
use url::{Host, Url};

const SRV_SCHEME: &str = "mongodb+srv";

/// Port used when the URI names none.
pub const DEFAULT_PORT: u16 = 27017;

/// Error type for endpoint extraction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("empty URI")]
    Empty,

    #[error("missing scheme")]
    MissingScheme,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("invalid host: {0}")]
    InvalidHost(String),

    #[error("SRV lookup failed: {0}")]
    Resolution(String),
}

/// A host/port pair to open a bare TCP connection to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Extract the first endpoint of a connection string.
///
/// Steps:
/// 1. Trim whitespace and check the scheme
/// 2. Drop credentials (`user:pass@`)
/// 3. Keep the authority up to the first `/` or `?`
/// 4. Take the first host of a seed list
/// 5. Default the port to 27017
pub fn parse_endpoint(uri: &str) -> Result<Endpoint, EndpointError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::Empty);
    }

    let (scheme, rest) = trimmed.split_once("://").ok_or(EndpointError::MissingScheme)?;
    if !SUPPORTED_SCHEMES.contains(&scheme) {
        return Err(EndpointError::UnsupportedScheme(scheme.to_string()));
    }

    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let hosts = authority.rsplit_once('@').map_or(authority, |(_, hosts)| hosts);
    let first = hosts.split(',').next().unwrap_or_default().trim();
    if first.is_empty() {
        return Err(EndpointError::MissingHost);
    }

    let parsed = Url::parse(&format!("mongodb://{first}")).map_err(|e| EndpointError::InvalidHost(e.to_string()))?;

    let host = match parsed.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        _ => return Err(EndpointError::MissingHost),
    };

    Ok(Endpoint { host, port: parsed.port().unwrap_or(DEFAULT_PORT) })
}

/// Whether the connection string names an SRV record rather than hosts.
pub fn uses_srv(uri: &str) -> bool {
    uri.trim().split_once("://").is_some_and(|(scheme, _)| scheme == SRV_SCHEME)
}

/// Resolve a `mongodb+srv://` URI to the first host of its published seed list.
///
/// The lookup is done by the driver's own connection-string parser, so the
/// probed host is the one the driver would dial.
pub async fn resolve_srv(uri: &str) -> Result<Endpoint, EndpointError> {
    let options = ClientOptions::parse(uri.trim().to_string())
        .await
        .map_err(|e| EndpointError::Resolution(e.to_string()))?;

    options
        .hosts
        .into_iter()
        .find_map(|address| match address {
            ServerAddress::Tcp { host, port } => Some(Endpoint { host, port: port.unwrap_or(DEFAULT_PORT) }),
            _ => None,
        })
        .ok_or(EndpointError::MissingHost)
}
