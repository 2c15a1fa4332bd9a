//! Typed views of the content records held in the cache.
//!
//! The content pipeline writes these shapes; readers that need to tolerate
//! malformed entries should work on `serde_json::Value` instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::connection::CacheDb;
use super::keys::{page_key, site_content_key, site_key};
use crate::Error;

/// A site: the ordered pages it renders plus site-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: String,
    #[serde(default)]
    pub page_order: Vec<String>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// A page and its opaque render payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub data: Value,
}

/// A fully resolved site with its pages flattened in render order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    pub site: SiteRecord,
    pub pages: Vec<PageRecord>,
}

impl CacheDb {
    /// Store a site record under `site:{id}`.
    pub async fn put_site(&self, site: &SiteRecord) -> Result<(), Error> {
        self.put(&site_key(&site.id), site).await
    }

    /// Store a page record under `page:{id}`.
    pub async fn put_page(&self, page: &PageRecord) -> Result<(), Error> {
        self.put(&page_key(&page.id), page).await
    }

    /// Store an aggregated record under `site-content:{site.id}`.
    pub async fn put_site_content(&self, content: &SiteContent) -> Result<(), Error> {
        self.put(&site_content_key(&content.site.id), content).await
    }

    /// Load the aggregated record for `site_id`, if any.
    pub async fn get_site_content(&self, site_id: &str) -> Result<Option<SiteContent>, Error> {
        self.get(&site_content_key(site_id)).await
    }
}
