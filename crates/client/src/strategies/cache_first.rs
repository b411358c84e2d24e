//! Cache-first and cache-only strategies.

use async_trait::async_trait;
use precache_core::{Error, StrategyKind};
use url::Url;

use super::{Strategy, StrategyContext};
use crate::response::{CachedResponse, ResponseSource};

/// Serve from the runtime cache; on a miss fetch, cache and return.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheFirst;

#[async_trait]
impl Strategy for CacheFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CacheFirst
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<CachedResponse, Error> {
        if let Some(entry) = ctx.cached(url).await? {
            tracing::debug!(%url, "runtime cache hit");
            return Ok(CachedResponse::from_entry(entry, ResponseSource::Cache));
        }

        let response = ctx.client.send(url).await?;
        ctx.store_logged(&response).await;
        Ok(CachedResponse::from_network(&response))
    }
}

/// Serve only from the runtime cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOnly;

#[async_trait]
impl Strategy for CacheOnly {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CacheOnly
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<CachedResponse, Error> {
        ctx.cached(url)
            .await?
            .map(|entry| CachedResponse::from_entry(entry, ResponseSource::Cache))
            .ok_or_else(|| Error::CacheMiss(url.to_string()))
    }
}
