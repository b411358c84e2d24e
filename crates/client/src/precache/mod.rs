//! Precache manifest consumer.
//!
//! ### Install
//! - Compare the manifest with the precache store.
//! - Fetch every entry that is missing or stored under another revision,
//!   with bounded concurrency. Entries already stored at the same revision
//!   are not refetched.
//! - A failed fetch aborts only that entry (its previous copy, if any, stays)
//!   and is reported. No retries.
//!
//! ### Activate
//! - Delete stored entries whose url is no longer in the manifest.
//! - Fetch entries whose stored revision differs again. The new copy replaces
//!   the stale one only once it has been fetched; on failure the stale copy
//!   stays (and is retried by the next install or activate).
//! - Record the manifest as the active one.
//!
//! ### Match
//! - Look a request up under its url variations (tracking parameters
//!   stripped, directory index, clean urls).

use std::sync::Arc;

use precache_core::{CacheDb, CacheEntry, Error, Manifest, ManifestDiff, StoredEntry};
use reqwest::header;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{FetchClient, UrlMatcher, relative_to, resolve};
use crate::response::{CachedResponse, ResponseSource};

/// An entry that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub url: String,
    pub error: String,
}

/// Result of an install step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    /// Urls fetched and stored, in manifest order.
    pub fetched: Vec<String>,
    /// Entries already stored at the manifest revision.
    pub up_to_date: usize,
    pub failed: Vec<FailedEntry>,
}

/// Result of an activate step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    /// Urls removed because the manifest no longer lists them.
    pub deleted: Vec<String>,
    /// Stale or missing urls fetched again.
    pub refetched: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

/// Installs, activates and serves a precache manifest.
#[derive(Debug, Clone)]
pub struct Precacher {
    db: CacheDb,
    client: FetchClient,
    origin: Url,
    cache_name: String,
    concurrency: usize,
    matcher: UrlMatcher,
}

impl Precacher {
    pub fn new(db: CacheDb, client: FetchClient, origin: Url, cache_name: impl Into<String>) -> Self {
        Self { db, client, origin, cache_name: cache_name.into(), concurrency: 4, matcher: UrlMatcher::default() }
    }

    /// Maximum concurrent fetches (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_matcher(mut self, matcher: UrlMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Compare `manifest` with what the precache currently stores.
    pub async fn diff(&self, manifest: &Manifest) -> Result<ManifestDiff, Error> {
        let stored = self.db.list_revisions(&self.cache_name).await?;
        Ok(manifest.diff(stored.iter().map(|(url, rev)| (url.as_str(), rev.as_deref()))))
    }

    /// Fetch and store every entry not yet cached at its manifest revision.
    pub async fn install(&self, manifest: &Manifest) -> Result<InstallReport, Error> {
        let diff = self.diff(manifest).await?;
        let (fetched, failed) = self.fetch_all(diff.to_fetch().cloned().collect()).await?;

        tracing::info!(
            cache = %self.cache_name,
            fetched = fetched.len(),
            up_to_date = diff.unchanged.len(),
            failed = failed.len(),
            "precache install finished"
        );

        Ok(InstallReport { fetched, up_to_date: diff.unchanged.len(), failed })
    }

    /// Retire entries the manifest no longer lists and refresh stale ones.
    ///
    /// Stale rows are overwritten in place, so a failed refetch keeps serving
    /// the previous copy.
    pub async fn activate(&self, manifest: &Manifest) -> Result<ActivateReport, Error> {
        let diff = self.diff(manifest).await?;

        self.db.delete_entries(&self.cache_name, diff.removed.clone()).await?;

        let (refetched, failed) = self.fetch_all(diff.to_fetch().cloned().collect()).await?;
        self.db.record_manifest(&self.cache_name, manifest).await?;

        tracing::info!(
            cache = %self.cache_name,
            deleted = diff.removed.len(),
            refetched = refetched.len(),
            failed = failed.len(),
            "precache activate finished"
        );

        Ok(ActivateReport { deleted: diff.removed, refetched, failed })
    }

    /// Find a precached response for a request url.
    pub async fn lookup(&self, url: &Url) -> Result<Option<CachedResponse>, Error> {
        for candidate in self.matcher.variations(url) {
            let Some(relative) = relative_to(&self.origin, &candidate) else {
                continue;
            };
            if let Some(entry) = self.db.get_entry(&self.cache_name, &relative).await? {
                tracing::debug!(%url, matched = %relative, "precache hit");
                return Ok(Some(CachedResponse::from_entry(entry, ResponseSource::Precache)));
            }
        }
        Ok(None)
    }

    /// Fetch one manifest entry and store it under its revision.
    pub async fn fetch_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let url = resolve(&self.origin, &entry.url)?;
        let response = self.client.fetch(&url).await?;

        let mut stored = StoredEntry::new(&self.cache_name, &entry.url, response.status.as_u16(), response.bytes.to_vec())
            .with_revision(&entry.revision)
            .with_content_type(response.content_type.clone());
        stored.etag = response.header_str(header::ETAG);
        stored.last_modified = response.header_str(header::LAST_MODIFIED);

        self.db.put_entry(&stored).await
    }

    /// Fetch entries with bounded concurrency, keeping manifest order in the
    /// returned lists.
    async fn fetch_all(&self, entries: Vec<CacheEntry>) -> Result<(Vec<String>, Vec<FailedEntry>), Error> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::HttpError(e.to_string()))?;
            let this = self.clone();

            join_set.spawn(async move {
                // Held for the task's lifetime to bound concurrency.
                let _permit = permit;
                let result = this.fetch_entry(&entry).await;
                (index, entry.url, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            results.push(joined.map_err(|e| Error::HttpError(format!("precache task failed: {e}")))?);
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut fetched = Vec::new();
        let mut failed = Vec::new();
        for (_, url, result) in results {
            match result {
                Ok(()) => fetched.push(url),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "failed to precache entry");
                    failed.push(FailedEntry { url, error: e.to_string() });
                }
            }
        }

        Ok((fetched, failed))
    }
}
