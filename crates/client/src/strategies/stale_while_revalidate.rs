//! Stale-while-revalidate strategy.

use async_trait::async_trait;
use precache_core::{Error, StrategyKind};
use url::Url;

use super::{Strategy, StrategyContext};
use crate::response::{CachedResponse, ResponseSource};

/// Serve the cached copy immediately and refresh it in the background; on a
/// miss wait for the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaleWhileRevalidate;

#[async_trait]
impl Strategy for StaleWhileRevalidate {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StaleWhileRevalidate
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<CachedResponse, Error> {
        if let Some(entry) = ctx.cached(url).await? {
            let ctx = ctx.clone();
            let url = url.clone();
            tokio::spawn(async move {
                match ctx.client.send(&url).await {
                    Ok(response) => ctx.store_logged(&response).await,
                    Err(e) => tracing::debug!(%url, error = %e, "background revalidation failed"),
                }
            });
            return Ok(CachedResponse::from_entry(entry, ResponseSource::Cache));
        }

        let response = ctx.client.send(url).await?;
        ctx.store_logged(&response).await;
        Ok(CachedResponse::from_network(&response))
    }
}
