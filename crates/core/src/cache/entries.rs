//! Partition and entry operations.
//!
//! Provides the cache store contract: idempotent partition creation,
//! 2xx-only write-through storage, priority-ordered lookup across
//! partitions, enumeration in insertion order, and the pruning sweeps
//! (whole partition, oldest-first size bound, age-based expiry).

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response stored in a partition.
///
/// The key is the request identity hash; the URL rides along for
/// diagnostics and domain sweeps. Headers are kept as a JSON array of
/// (name, value) pairs exactly as captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key: String,
    pub url: String,
    pub status: u16,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedEntry {
    /// Build an entry stamped with the current time.
    pub fn new(key: &str, url: &str, status: u16, headers_json: Option<String>, body: Vec<u8>) -> Self {
        Self {
            key: key.to_string(),
            url: url.to_string(),
            status,
            headers_json,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the captured status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the captured header pairs, tolerating absent or bad JSON.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<CachedEntry, rusqlite::Error> {
    Ok(CachedEntry {
        key: row.get(0)?,
        url: row.get(1)?,
        status: row.get::<_, i64>(2)? as u16,
        headers_json: row.get(3)?,
        body: row.get(4)?,
        stored_at: row.get(5)?,
    })
}

const ENTRY_COLUMNS: &str = "key, url, status, headers_json, body, stored_at";

impl CacheDb {
    /// Open a partition, creating it if absent. Idempotent.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store an entry in a partition.
    ///
    /// Only successful (2xx) responses are stored; anything else is
    /// ignored and `false` is returned. An existing entry for the same
    /// key is overwritten in place, keeping its original insertion order.
    pub async fn put(&self, partition: &str, entry: &CachedEntry) -> Result<bool, Error> {
        if !entry.is_success() {
            tracing::debug!(partition, url = %entry.url, status = entry.status, "skipping non-2xx response");
            return Ok(false);
        }

        let partition = partition.to_string();
        let entry = entry.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                conn.execute(
                    "INSERT INTO entries (partition, key, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(partition, key) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        partition,
                        entry.key,
                        entry.url,
                        entry.status as i64,
                        entry.headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(true)
    }

    /// Get an entry from one partition by key.
    ///
    /// Returns None if the key doesn't exist in the partition.
    pub async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND key = ?2");
                let result = conn.query_row(&sql, params![partition, key], row_to_entry);

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Search partitions in the given priority order and return the first
    /// match; None if no partition holds the key.
    pub async fn find(&self, partitions: &[String], key: &str) -> Result<Option<CachedEntry>, Error> {
        let partitions = partitions.to_vec();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND key = ?2");
                let mut stmt = conn.prepare(&sql)?;
                for partition in &partitions {
                    match stmt.query_row(params![partition, key], row_to_entry) {
                        Ok(entry) => return Ok(Some(entry)),
                        Err(rusqlite::Error::QueryReturnedNoRows) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and everything in it.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_partition(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions that currently exist.
    pub async fn list_partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry keys of a partition in insertion order, oldest first.
    pub async fn list_keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![partition], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Evict oldest-inserted entries until the partition holds at most
    /// `max_items`. No-op when already within the bound.
    ///
    /// Returns the number of deleted entries.
    pub async fn enforce_limit(&self, partition: &str, max_items: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = max_items as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE seq IN (
                        SELECT seq FROM entries WHERE partition = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![partition, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries older than `max_age` across all partitions.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self, max_age: chrono::Duration) -> Result<u64, Error> {
        let cutoff = (chrono::Utc::now() - max_age).to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE stored_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::compute_cache_key;

    fn make_entry(url: &str, status: u16) -> CachedEntry {
        let key = compute_cache_key("GET", url);
        CachedEntry::new(&key, url, status, None, url.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://units-hub.app/style.css", 200);

        let stored = db.put("units-hub-static-v1", &entry).await.unwrap();
        assert!(stored);

        let found = db.get("units-hub-static-v1", &entry.key).await.unwrap().unwrap();
        assert_eq!(found.status, entry.status);
        assert_eq!(found.body, entry.body);
        assert_eq!(found.url, entry.url);
    }

    #[tokio::test]
    async fn test_put_rejects_non_success() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://units-hub.app/missing", 404);

        let stored = db.put("units-hub-dynamic-v1", &entry).await.unwrap();
        assert!(!stored);
        assert!(db.get("units-hub-dynamic-v1", &entry.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.get("units-hub-static-v1", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_insertion_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = make_entry("https://units-hub.app/a", 200);
        let second = make_entry("https://units-hub.app/b", 200);

        db.put("p", &first).await.unwrap();
        db.put("p", &second).await.unwrap();

        // Overwriting the first entry must not move it to the back.
        let updated = CachedEntry::new(&first.key, &first.url, 200, None, b"new body".to_vec());
        db.put("p", &updated).await.unwrap();

        let keys = db.list_keys("p").await.unwrap();
        assert_eq!(keys, vec![first.key.clone(), second.key.clone()]);

        let found = db.get("p", &first.key).await.unwrap().unwrap();
        assert_eq!(found.body, b"new body");
    }

    #[tokio::test]
    async fn test_find_priority_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry("https://units-hub.app/shared", 200);

        let dynamic_copy = CachedEntry { body: b"dynamic".to_vec(), ..entry.clone() };
        let static_copy = CachedEntry { body: b"static".to_vec(), ..entry.clone() };
        db.put("app-dynamic", &dynamic_copy).await.unwrap();
        db.put("app-static", &static_copy).await.unwrap();

        let order = ["app-static".to_string(), "app-dynamic".to_string(), "app-images".to_string()];
        let found = db.find(&order, &entry.key).await.unwrap().unwrap();
        assert_eq!(found.body, b"static");
    }

    #[tokio::test]
    async fn test_find_absent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let order = ["app-static".to_string(), "app-dynamic".to_string()];
        assert!(db.find(&order, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("app-static-v1").await.unwrap();
        db.open_partition("app-static-v1").await.unwrap();

        let names = db.list_partition_names().await.unwrap();
        assert_eq!(names, vec!["app-static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("app-old", &make_entry("https://units-hub.app/a", 200)).await.unwrap();
        db.put("app-old", &make_entry("https://units-hub.app/b", 200)).await.unwrap();
        db.put("app-new", &make_entry("https://units-hub.app/c", 200)).await.unwrap();

        let deleted = db.delete_partition("app-old").await.unwrap();
        assert_eq!(deleted, 2);

        let names = db.list_partition_names().await.unwrap();
        assert_eq!(names, vec!["app-new".to_string()]);
    }

    #[tokio::test]
    async fn test_enforce_limit_evicts_oldest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let urls: Vec<String> = (0..5).map(|i| format!("https://units-hub.app/item/{i}")).collect();
        for url in &urls {
            db.put("app-dynamic", &make_entry(url, 200)).await.unwrap();
        }

        let deleted = db.enforce_limit("app-dynamic", 3).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.count("app-dynamic").await.unwrap(), 3);

        // The two oldest-inserted entries are the ones gone.
        let keys = db.list_keys("app-dynamic").await.unwrap();
        let expected: Vec<String> = urls[2..].iter().map(|u| compute_cache_key("GET", u)).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_enforce_limit_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for i in 0..3 {
            db.put("app-dynamic", &make_entry(&format!("https://units-hub.app/{i}"), 200))
                .await
                .unwrap();
        }

        assert_eq!(db.enforce_limit("app-dynamic", 3).await.unwrap(), 0);
        assert_eq!(db.enforce_limit("app-dynamic", 3).await.unwrap(), 0);
        assert_eq!(db.count("app-dynamic").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_enforce_limit_scoped_to_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("app-static", &make_entry("https://units-hub.app/style.css", 200)).await.unwrap();
        for i in 0..4 {
            db.put("app-dynamic", &make_entry(&format!("https://units-hub.app/{i}"), 200))
                .await
                .unwrap();
        }

        db.enforce_limit("app-dynamic", 2).await.unwrap();
        assert_eq!(db.count("app-dynamic").await.unwrap(), 2);
        assert_eq!(db.count("app-static").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut old = make_entry("https://units-hub.app/old", 200);
        old.stored_at = (chrono::Utc::now() - chrono::Duration::days(40)).to_rfc3339();
        db.put("app-dynamic", &old).await.unwrap();
        db.put("app-dynamic", &make_entry("https://units-hub.app/fresh", 200)).await.unwrap();

        let purged = db.purge_expired(chrono::Duration::days(30)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(db.get("app-dynamic", &old.key).await.unwrap().is_none());
    }

    #[test]
    fn test_headers_round_trip() {
        let headers = vec![("content-type".to_string(), "text/css".to_string())];
        let json = serde_json::to_string(&headers).unwrap();
        let entry = CachedEntry::new("k", "https://units-hub.app/style.css", 200, Some(json), Vec::new());
        assert_eq!(entry.headers(), headers);

        let bare = CachedEntry::new("k", "https://units-hub.app/style.css", 200, None, Vec::new());
        assert!(bare.headers().is_empty());
    }
}
