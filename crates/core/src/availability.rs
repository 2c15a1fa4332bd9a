//! Data-availability decision.
//!
//! Decides, before rendering starts, whether the cache alone holds everything
//! a site needs. The check is read-only and fails toward requiring the
//! database: an incomplete answer is never reported as sufficient.
//!
//! ### Order of checks
//! 1. `site-content:{id}` present: sufficient, nothing else is read.
//! 2. `site:{id}` absent or unreadable: database required.
//! 3. Every id in the site's `pageOrder` must map to a page object whose
//!    `data` field is present and non-null.

use std::fmt;

use serde_json::Value;

use crate::cache::CacheDb;
use crate::cache::keys::{page_key, site_content_key, site_key};

/// Why the cache cannot serve a site on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredReason {
    /// No site record, so pages cannot be enumerated.
    SiteMissing,
    /// The site record is not a JSON object.
    SiteMalformed,
    /// Listed pages are absent or lack usable `data`.
    PagesMissing { missing: Vec<String>, malformed: Vec<String> },
    /// A cache read failed.
    LookupFailed(String),
}

impl fmt::Display for RequiredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredReason::SiteMissing => write!(f, "site record missing"),
            RequiredReason::SiteMalformed => write!(f, "site record malformed"),
            RequiredReason::PagesMissing { missing, malformed } => write!(
                f,
                "{} page(s) missing, {} page(s) malformed",
                missing.len(),
                malformed.len()
            ),
            RequiredReason::LookupFailed(err) => write!(f, "cache lookup failed: {err}"),
        }
    }
}

/// Outcome of the availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    CacheSufficient,
    DatabaseRequired(RequiredReason),
}

impl Availability {
    pub fn is_cache_sufficient(&self) -> bool {
        matches!(self, Availability::CacheSufficient)
    }
}

enum PageState {
    Present,
    Missing,
    Malformed,
}

fn page_state(record: Option<&Value>) -> PageState {
    match record {
        None => PageState::Missing,
        Some(Value::Object(fields)) => match fields.get("data") {
            Some(Value::Null) | None => PageState::Malformed,
            Some(_) => PageState::Present,
        },
        Some(_) => PageState::Malformed,
    }
}

/// Decide whether the cache can serve `site_id` without the database.
///
/// Never errors: any failed read is folded into
/// [`RequiredReason::LookupFailed`].
pub async fn check_availability(cache: &CacheDb, site_id: &str) -> Availability {
    let availability = match evaluate(cache, site_id).await {
        Ok(availability) => availability,
        Err(err) => Availability::DatabaseRequired(RequiredReason::LookupFailed(err.to_string())),
    };

    match &availability {
        Availability::CacheSufficient => tracing::debug!(site_id, "cache holds all content for site"),
        Availability::DatabaseRequired(reason) => {
            tracing::info!(site_id, reason = %reason, "cache cannot serve site on its own");
        }
    }

    availability
}

async fn evaluate(cache: &CacheDb, site_id: &str) -> Result<Availability, crate::Error> {
    if cache.contains(&site_content_key(site_id)).await? {
        return Ok(Availability::CacheSufficient);
    }

    let site = match cache.get_value(&site_key(site_id)).await? {
        Some(Value::Object(site)) => site,
        Some(_) => return Ok(Availability::DatabaseRequired(RequiredReason::SiteMalformed)),
        None => return Ok(Availability::DatabaseRequired(RequiredReason::SiteMissing)),
    };

    let Some(Value::Array(page_order)) = site.get("pageOrder") else {
        return Ok(Availability::CacheSufficient);
    };

    let mut missing = Vec::new();
    let mut malformed = Vec::new();

    for entry in page_order {
        let Value::String(page_id) = entry else {
            malformed.push(entry.to_string());
            continue;
        };

        // A page that exists but fails to decode is corrupt, not absent.
        let record = match cache.get_value(&page_key(page_id)).await {
            Ok(record) => record,
            Err(crate::Error::Serialization { .. }) => {
                malformed.push(page_id.clone());
                continue;
            }
            Err(err) => return Err(err),
        };

        match page_state(record.as_ref()) {
            PageState::Present => {}
            PageState::Missing => missing.push(page_id.clone()),
            PageState::Malformed => malformed.push(page_id.clone()),
        }
    }

    if missing.is_empty() && malformed.is_empty() {
        Ok(Availability::CacheSufficient)
    } else {
        tracing::debug!(site_id, ?missing, ?malformed, "incomplete page set in cache");
        Ok(Availability::DatabaseRequired(RequiredReason::PagesMissing { missing, malformed }))
    }
}
