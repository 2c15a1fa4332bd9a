//! Key-value entry operations.
//!
//! Values are stored as JSON text. Writes use UPSERT semantics and stamp
//! `updated_at` so operators can tell how stale the cache is.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

fn check_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidKey("cache keys must not be empty".to_string()));
    }
    Ok(())
}

impl CacheDb {
    /// Get the raw JSON value stored under `key`.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_value(&self, key: &str) -> Result<Option<Value>, Error> {
        check_key(key)?;
        let lookup = key.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT value FROM entries WHERE key = ?1")?;

                match stmt.query_row(params![lookup], |row| row.get(0)) {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(|json| serde_json::from_str(&json).map_err(|e| Error::serialization(key, e)))
            .transpose()
    }

    /// Get the value stored under `key`, decoded into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.get_value(key)
            .await?
            .map(|value| serde_json::from_value(value).map_err(|e| Error::serialization(key, e)))
            .transpose()
    }

    /// Insert or replace the JSON value stored under `key`.
    pub async fn put_value(&self, key: &str, value: &Value) -> Result<(), Error> {
        check_key(key)?;
        let json = serde_json::to_string(value).map_err(|e| Error::serialization(key, e))?;
        let key = key.to_string();
        let updated_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (key, value, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, json, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Serialize `value` and store it under `key`.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let value = serde_json::to_value(value).map_err(|e| Error::serialization(key, e))?;
        self.put_value(key, &value).await
    }

    /// Check whether an entry exists without decoding it.
    pub async fn contains(&self, key: &str) -> Result<bool, Error> {
        check_key(key)?;
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM entries WHERE key = ?1)",
                    params![key],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry.
    ///
    /// Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        check_key(key)?;
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the store.
    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List keys starting with `prefix`, in ascending order.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, Error> {
        let prefix = prefix.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key FROM entries WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(params![prefix], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Banner {
        text: String,
        visible: bool,
    }

    #[tokio::test]
    async fn test_put_and_get_value() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let value = json!({"data": {"title": "Home"}});

        db.put_value("page:home", &value).await.unwrap();

        let retrieved = db.get_value("page:home").await.unwrap().unwrap();
        assert_eq!(retrieved, value);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_value("page:nope").await.unwrap().is_none());
        assert!(!db.contains("page:nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let banner = Banner { text: "Launch week".into(), visible: true };

        db.put("banner", &banner).await.unwrap();

        let retrieved: Banner = db.get("banner").await.unwrap().unwrap();
        assert_eq!(retrieved, banner);
    }

    #[tokio::test]
    async fn test_typed_get_reports_shape_mismatch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_value("banner", &json!(["not", "a", "banner"])).await.unwrap();

        let result = db.get::<Banner>("banner").await;
        assert!(matches!(result, Err(Error::Serialization { key, .. }) if key == "banner"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_value() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_value("page:home", &json!({"data": 1})).await.unwrap();
        db.put_value("page:home", &json!({"data": 2})).await.unwrap();

        assert_eq!(db.get_value("page:home").await.unwrap(), Some(json!({"data": 2})));
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_value("page:home", &json!({"data": 1})).await.unwrap();

        assert!(db.delete("page:home").await.unwrap());
        assert!(!db.delete("page:home").await.unwrap());
        assert!(db.get_value("page:home").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for key in ["page:b", "page:a", "site:docs", "site-content:docs"] {
            db.put_value(key, &json!({})).await.unwrap();
        }

        assert_eq!(db.keys_with_prefix("page:").await.unwrap(), vec!["page:a", "page:b"]);
        assert_eq!(db.keys_with_prefix("site:").await.unwrap(), vec!["site:docs"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_value("site:docs", &json!({})).await.unwrap();
        db.put_value("page:home", &json!({})).await.unwrap();

        assert_eq!(db.clear().await.unwrap(), 2);
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.put_value("", &json!({})).await, Err(Error::InvalidKey(_))));
    }
}
