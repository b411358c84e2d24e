//! cache_purge tool implementation.
//!
//! Purges cache entries by age, url pattern, or count.

use chrono::{Duration, Utc};
use precache_core::{AppConfig, CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cache_name;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// "precache", "runtime" (default) or a full cache name.
    #[serde(default)]
    pub cache: Option<String>,

    /// Purge entries stored more than this many days ago.
    pub older_than_days: Option<i64>,

    /// Purge entries whose url contains this substring.
    pub url_pattern: Option<String>,

    /// Keep only the newest N entries (LRU purge).
    pub max_entries: Option<usize>,

    /// Delete every entry of the cache.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub cache_name: String,
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, config: &AppConfig, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.older_than_days.is_none() && params.url_pattern.is_none() && params.max_entries.is_none() && !params.all {
        return Err(Error::InvalidInput(
            "At least one of older_than_days, url_pattern, max_entries or all must be specified".to_string(),
        )
        .into());
    }

    let name = cache_name(config, params.cache.as_deref());
    let mut deleted_total = 0u64;

    if params.all {
        deleted_total += cache.clear_cache(&name).await?;
    }

    if let Some(days) = params.older_than_days {
        if days < 0 {
            return Err(Error::InvalidInput("older_than_days cannot be negative".to_string()).into());
        }
        deleted_total += cache.purge_stored_before(&name, Utc::now() - Duration::days(days)).await?;
    }

    if let Some(pattern) = params.url_pattern.as_deref().filter(|p| !p.is_empty()) {
        deleted_total += cache.purge_by_url_pattern(Some(&name), pattern).await?;
    }

    if let Some(max_entries) = params.max_entries {
        deleted_total += cache.purge_lru(&name, max_entries).await?;
    }

    tracing::info!(cache = %name, deleted = deleted_total, "cache purged");

    json_result(&CachePurgeOutput { cache_name: name, deleted: deleted_total })
}
