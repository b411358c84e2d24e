//! Cached response CRUD operations.
//!
//! Every named cache (precache, runtime) shares the `entries` table; rows are
//! keyed by `(cache_name, url)`.

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Timestamp format used for `stored_at`, so lexical order matches time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A response stored in one of the caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub cache_name: String,
    pub url: String,
    /// Manifest revision for precache rows, `None` for runtime rows.
    pub revision: Option<String>,
    pub status_code: u16,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub stored_at: String,
}

impl StoredEntry {
    /// A new entry stamped with the current time.
    pub fn new(cache_name: impl Into<String>, url: impl Into<String>, status_code: u16, body: Vec<u8>) -> Self {
        Self {
            cache_name: cache_name.into(),
            url: url.into(),
            revision: None,
            status_code,
            content_type: None,
            body,
            etag: None,
            last_modified: None,
            stored_at: timestamp(Utc::now()),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }
}

/// Per-cache entry count and body size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    pub cache_name: String,
    pub entries: u64,
    pub bytes: u64,
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredEntry> {
    Ok(StoredEntry {
        cache_name: row.get(0)?,
        url: row.get(1)?,
        revision: row.get(2)?,
        status_code: row.get(3)?,
        content_type: row.get(4)?,
        body: row.get(5)?,
        etag: row.get(6)?,
        last_modified: row.get(7)?,
        stored_at: row.get(8)?,
    })
}

impl CacheDb {
    /// Insert or replace a cached response.
    pub async fn put_entry(&self, entry: &StoredEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    cache_name, url, revision, status_code, content_type,
                    body, etag, last_modified, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(cache_name, url) DO UPDATE SET
                    revision = excluded.revision,
                    status_code = excluded.status_code,
                    content_type = excluded.content_type,
                    body = excluded.body,
                    etag = excluded.etag,
                    last_modified = excluded.last_modified,
                    stored_at = excluded.stored_at",
                    params![
                        &entry.cache_name,
                        &entry.url,
                        &entry.revision,
                        entry.status_code,
                        &entry.content_type,
                        &entry.body,
                        &entry.etag,
                        &entry.last_modified,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a cached response. Returns None on a miss.
    pub async fn get_entry(&self, cache_name: &str, url: &str) -> Result<Option<StoredEntry>, Error> {
        let cache_name = cache_name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let result = conn.query_row(
                    "SELECT cache_name, url, revision, status_code, content_type,
                        body, etag, last_modified, stored_at
                    FROM entries WHERE cache_name = ?1 AND url = ?2",
                    params![cache_name, url],
                    row_to_entry,
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// `(url, revision)` of every entry in a cache, ordered by url.
    pub async fn list_revisions(&self, cache_name: &str) -> Result<Vec<(String, Option<String>)>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<(String, Option<String>)>, Error> {
                let mut stmt = conn.prepare("SELECT url, revision FROM entries WHERE cache_name = ?1 ORDER BY url")?;
                let rows = stmt
                    .query_map(params![cache_name], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns whether a row was removed.
    pub async fn delete_entry(&self, cache_name: &str, url: &str) -> Result<bool, Error> {
        let cache_name = cache_name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND url = ?2",
                    params![cache_name, url],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a batch of urls from a cache in one transaction.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_entries(&self, cache_name: &str, urls: Vec<String>) -> Result<u64, Error> {
        if urls.is_empty() {
            return Ok(0);
        }
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM entries WHERE cache_name = ?1 AND url = ?2")?;
                    for url in &urls {
                        deleted += stmt.execute(params![cache_name, url])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry of a cache.
    pub async fn clear_cache(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE cache_name = ?1", params![cache_name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries stored before `cutoff`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_stored_before(&self, cache_name: &str, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        let cutoff = timestamp(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND stored_at < ?2",
                    params![cache_name, cutoff],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose url contains `pattern`, across all caches when
    /// `cache_name` is None.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_by_url_pattern(&self, cache_name: Option<&str>, pattern: &str) -> Result<u64, Error> {
        let cache_name = cache_name.map(str::to_string);
        let pattern = format!("%{pattern}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE url LIKE ?1 AND (?2 IS NULL OR cache_name = ?2)",
                    params![pattern, cache_name],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries of a cache until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru(&self, cache_name: &str, max_entries: usize) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND url IN (
                    SELECT url FROM entries WHERE cache_name = ?1
                    ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                )",
                    params![cache_name, count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry count and total body size per cache.
    pub async fn stats(&self) -> Result<Vec<CacheStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_name, COUNT(*), COALESCE(SUM(LENGTH(body)), 0)
                    FROM entries GROUP BY cache_name ORDER BY cache_name",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(CacheStats {
                            cache_name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRECACHE: &str = "site-precache-v2";
    const RUNTIME: &str = "site-runtime";

    fn make_entry(cache_name: &str, url: &str) -> StoredEntry {
        StoredEntry::new(cache_name, url, 200, format!("body of {url}").into_bytes())
            .with_content_type(Some("text/html".to_string()))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = make_entry(PRECACHE, "index.html").with_revision("ec6e66608ef682b70db93396b368de30");

        db.put_entry(&entry).await.unwrap();

        let retrieved = db.get_entry(PRECACHE, "index.html").await.unwrap().unwrap();
        assert_eq!(retrieved.url, "index.html");
        assert_eq!(retrieved.body, entry.body);
        assert_eq!(retrieved.revision.as_deref(), Some("ec6e66608ef682b70db93396b368de30"));
        assert_eq!(retrieved.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_caches_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&make_entry(RUNTIME, "app.js")).await.unwrap();

        assert!(db.get_entry(PRECACHE, "app.js").await.unwrap().is_none());
        assert!(db.get_entry(RUNTIME, "app.js").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&make_entry(PRECACHE, "app.js").with_revision("aa")).await.unwrap();
        db.put_entry(&make_entry(PRECACHE, "app.js").with_revision("bb")).await.unwrap();

        let revisions = db.list_revisions(PRECACHE).await.unwrap();
        assert_eq!(revisions, vec![("app.js".to_string(), Some("bb".to_string()))]);
    }

    #[tokio::test]
    async fn test_delete_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for url in ["a.js", "b.js", "c.js"] {
            db.put_entry(&make_entry(PRECACHE, url)).await.unwrap();
        }

        let deleted = db
            .delete_entries(PRECACHE, vec!["a.js".into(), "c.js".into(), "missing.js".into()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining: Vec<String> = db.list_revisions(PRECACHE).await.unwrap().into_iter().map(|(u, _)| u).collect();
        assert_eq!(remaining, vec!["b.js".to_string()]);
        assert!(db.delete_entry(PRECACHE, "b.js").await.unwrap());
        assert!(!db.delete_entry(PRECACHE, "b.js").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_by_url_pattern() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&make_entry(RUNTIME, "https://site.test/basic/a.js")).await.unwrap();
        db.put_entry(&make_entry(RUNTIME, "https://site.test/use-case/b.js")).await.unwrap();
        db.put_entry(&make_entry(PRECACHE, "basic/index.html")).await.unwrap();

        let deleted = db.purge_by_url_pattern(Some(RUNTIME), "basic/").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_entry(PRECACHE, "basic/index.html").await.unwrap().is_some());

        let deleted = db.purge_by_url_pattern(None, "basic/").await.unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_purge_lru() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut oldest = make_entry(RUNTIME, "old.js");
        oldest.stored_at = timestamp(Utc::now() - chrono::Duration::hours(1));
        db.put_entry(&oldest).await.unwrap();
        db.put_entry(&make_entry(RUNTIME, "new.js")).await.unwrap();

        let deleted = db.purge_lru(RUNTIME, 1).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_entry(RUNTIME, "old.js").await.unwrap().is_none());
        assert!(db.get_entry(RUNTIME, "new.js").await.unwrap().is_some());
        assert_eq!(db.purge_lru(RUNTIME, 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_stored_before() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut stale = make_entry(RUNTIME, "stale.css");
        stale.stored_at = timestamp(Utc::now() - chrono::Duration::days(2));
        db.put_entry(&stale).await.unwrap();
        db.put_entry(&make_entry(RUNTIME, "fresh.css")).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(1);
        assert_eq!(db.purge_stored_before(RUNTIME, cutoff).await.unwrap(), 1);
        assert!(db.get_entry(RUNTIME, "fresh.css").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&StoredEntry::new(PRECACHE, "a", 200, vec![0; 10])).await.unwrap();
        db.put_entry(&StoredEntry::new(PRECACHE, "b", 200, vec![0; 5])).await.unwrap();
        db.put_entry(&StoredEntry::new(RUNTIME, "c", 200, vec![0; 1])).await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(
            stats,
            vec![
                CacheStats { cache_name: PRECACHE.into(), entries: 2, bytes: 15 },
                CacheStats { cache_name: RUNTIME.into(), entries: 1, bytes: 1 },
            ]
        );

        assert_eq!(db.clear_cache(PRECACHE).await.unwrap(), 2);
        assert_eq!(db.stats().await.unwrap().len(), 1);
    }
}
