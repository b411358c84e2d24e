//! Network-first and network-only strategies.

use std::time::Duration;

use async_trait::async_trait;
use precache_core::{Error, StrategyKind};
use url::Url;

use super::{Strategy, StrategyContext, joined};
use crate::response::{CachedResponse, ResponseSource};

/// Prefer a live network response; fall back to the runtime cache when the
/// network fails or does not answer within `network_timeout`.
///
/// Successful (`200`) network responses refresh the cache, including ones
/// that arrive after the timeout already served a cached copy.
#[derive(Debug, Clone, Default)]
pub struct NetworkFirst {
    network_timeout: Option<Duration>,
}

impl NetworkFirst {
    pub fn new(network_timeout: Option<Duration>) -> Self {
        Self { network_timeout }
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout
    }
}

#[async_trait]
impl Strategy for NetworkFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NetworkFirst
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<CachedResponse, Error> {
        let mut network = {
            let client = ctx.client.clone();
            let url = url.clone();
            tokio::spawn(async move { client.send(&url).await })
        };

        let outcome = match self.network_timeout {
            None => joined((&mut network).await),
            Some(limit) => match tokio::time::timeout(limit, &mut network).await {
                Ok(result) => joined(result),
                Err(_) => {
                    if let Some(entry) = ctx.cached(url).await? {
                        tracing::debug!(%url, ?limit, "network timed out, serving runtime cache");
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            if let Ok(response) = joined(network.await) {
                                ctx.store_logged(&response).await;
                            }
                        });
                        return Ok(CachedResponse::from_entry(entry, ResponseSource::Cache));
                    }
                    joined(network.await)
                }
            },
        };

        match outcome {
            Ok(response) => {
                ctx.store_logged(&response).await;
                Ok(CachedResponse::from_network(&response))
            }
            Err(err) => match ctx.cached(url).await? {
                Some(entry) => {
                    tracing::debug!(%url, error = %err, "network failed, serving runtime cache");
                    Ok(CachedResponse::from_entry(entry, ResponseSource::Cache))
                }
                None => Err(err),
            },
        }
    }
}

/// Always use the network; the cache is never read or written.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkOnly;

#[async_trait]
impl Strategy for NetworkOnly {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NetworkOnly
    }

    async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<CachedResponse, Error> {
        let response = ctx.client.send(url).await?;
        Ok(CachedResponse::from_network(&response))
    }
}
