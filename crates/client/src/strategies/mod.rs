//! Runtime caching strategies.
//!
//! A [`Strategy`] decides, for one routed request, how the network and the
//! runtime cache are combined. Strategies only share the cache store.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

pub use cache_first::{CacheFirst, CacheOnly};
pub use network_first::{NetworkFirst, NetworkOnly};
pub use stale_while_revalidate::StaleWhileRevalidate;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use precache_core::{CacheDb, Error, StoredEntry, StrategyKind};
use reqwest::{StatusCode, header};
use tokio::task::JoinError;
use url::Url;

use crate::fetch::{FetchClient, FetchResponse};
use crate::response::CachedResponse;

/// A caching strategy applied to routed requests.
#[async_trait]
pub trait Strategy: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Produce a response for `url`.
    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<CachedResponse, Error>;
}

/// Build the strategy selected by `kind`.
///
/// `network_timeout` only affects network-first.
pub fn build(kind: StrategyKind, network_timeout: Option<Duration>) -> Arc<dyn Strategy> {
    match kind {
        StrategyKind::NetworkFirst => Arc::new(NetworkFirst::new(network_timeout)),
        StrategyKind::CacheFirst => Arc::new(CacheFirst),
        StrategyKind::NetworkOnly => Arc::new(NetworkOnly),
        StrategyKind::CacheOnly => Arc::new(CacheOnly),
        StrategyKind::StaleWhileRevalidate => Arc::new(StaleWhileRevalidate),
    }
}

/// Runtime cache limits, enforced after every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expiration {
    pub max_entries: Option<usize>,
    pub max_age: Option<Duration>,
}

impl Expiration {
    fn is_fresh(&self, stored_at: &str) -> bool {
        let Some(max_age) = self.max_age else {
            return true;
        };
        let Ok(stored_at) = DateTime::parse_from_rfc3339(stored_at) else {
            return false;
        };
        let age = Utc::now().signed_duration_since(stored_at.with_timezone(&Utc));
        age.to_std().map(|age| age <= max_age).unwrap_or(true)
    }

    async fn apply(&self, db: &CacheDb, cache_name: &str) -> Result<u64, Error> {
        let mut evicted = 0;
        if let Some(max_age) = self.max_age
            && let Ok(max_age) = chrono::Duration::from_std(max_age)
        {
            evicted += db.purge_stored_before(cache_name, Utc::now() - max_age).await?;
        }
        if let Some(max_entries) = self.max_entries {
            evicted += db.purge_lru(cache_name, max_entries).await?;
        }
        Ok(evicted)
    }
}

/// What a strategy works with: the runtime cache and the network.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub db: CacheDb,
    pub client: FetchClient,
    pub cache_name: String,
    pub expiration: Expiration,
}

impl StrategyContext {
    pub fn new(db: CacheDb, client: FetchClient, cache_name: impl Into<String>) -> Self {
        Self { db, client, cache_name: cache_name.into(), expiration: Expiration::default() }
    }

    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Runtime cache lookup; expired entries count as misses.
    pub async fn cached(&self, url: &Url) -> Result<Option<StoredEntry>, Error> {
        let entry = self.db.get_entry(&self.cache_name, url.as_str()).await?;
        Ok(entry.filter(|e| self.expiration.is_fresh(&e.stored_at)))
    }

    /// Store a network response in the runtime cache.
    ///
    /// Only `200 OK` responses are cacheable. Returns whether it was stored.
    pub async fn store(&self, response: &FetchResponse) -> Result<bool, Error> {
        if response.status != StatusCode::OK {
            tracing::debug!(url = %response.url, status = response.status.as_u16(), "response not cacheable");
            return Ok(false);
        }

        let mut entry = StoredEntry::new(&self.cache_name, response.url.as_str(), 200, response.bytes.to_vec())
            .with_content_type(response.content_type.clone());
        entry.etag = response.header_str(header::ETAG);
        entry.last_modified = response.header_str(header::LAST_MODIFIED);
        self.db.put_entry(&entry).await?;

        let evicted = self.expiration.apply(&self.db, &self.cache_name).await?;
        if evicted > 0 {
            tracing::debug!(cache = %self.cache_name, evicted, "expired runtime entries");
        }
        Ok(true)
    }

    /// [`store`](Self::store), logging instead of failing: a cache write
    /// never turns a good network response into an error.
    pub async fn store_logged(&self, response: &FetchResponse) {
        if let Err(e) = self.store(response).await {
            tracing::warn!(url = %response.url, error = %e, "failed to update runtime cache");
        }
    }
}

/// Flatten a spawned fetch into the fetch result.
fn joined(result: Result<Result<FetchResponse, Error>, JoinError>) -> Result<FetchResponse, Error> {
    result.map_err(|e| Error::HttpError(format!("fetch task failed: {e}")))?
}
