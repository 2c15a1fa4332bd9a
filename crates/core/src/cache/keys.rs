//! Cache key layout.
//!
//! Keys are shared with the content pipeline that fills the store, so the
//! formats here are an external contract.

pub const SITE_PREFIX: &str = "site:";
pub const PAGE_PREFIX: &str = "page:";
pub const SITE_CONTENT_PREFIX: &str = "site-content:";

/// Key of a site record: `site:{site_id}`.
pub fn site_key(site_id: &str) -> String {
    format!("{SITE_PREFIX}{site_id}")
}

/// Key of a page record: `page:{page_id}`.
pub fn page_key(page_id: &str) -> String {
    format!("{PAGE_PREFIX}{page_id}")
}

/// Key of the aggregated site-content record: `site-content:{site_id}`.
pub fn site_content_key(site_id: &str) -> String {
    format!("{SITE_CONTENT_PREFIX}{site_id}")
}
