//! cache_get tool implementation.
//!
//! Retrieves one stored entry. Precache entries are keyed by manifest url,
//! runtime entries by absolute url.

use precache_core::{AppConfig, CacheDb, Error, StoredEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cache_name;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Key of the entry to retrieve.
    pub url: String,

    /// "precache", "runtime" (default) or a full cache name.
    #[serde(default)]
    pub cache: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub entry: StoredEntry,
    pub body_bytes: usize,
    /// The body, when it is valid UTF-8.
    pub body: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, config: &AppConfig, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let name = cache_name(config, params.cache.as_deref());
    let entry = cache
        .get_entry(&name, &params.url)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{name}: {}", params.url)))?;

    let body = String::from_utf8(entry.body.clone()).ok();
    let output = CacheGetOutput { body_bytes: entry.body.len(), body, entry };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { url: "nonexistent.js".to_string(), cache: None };

        let err = get_impl(&cache, &AppConfig::default(), params).await.unwrap_err();
        assert!(err.message.contains("nonexistent.js"));
    }

    #[tokio::test]
    async fn test_get_impl_found_in_precache() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig::default();
        let entry = StoredEntry::new(config.cache_names().precache, "index.html", 200, b"<h1>home</h1>".to_vec())
            .with_revision("ec6e66608ef682b70db93396b368de30");
        cache.put_entry(&entry).await.unwrap();

        let params = CacheGetParams { url: "index.html".to_string(), cache: Some("precache".to_string()) };
        let result = get_impl(&cache, &config, params).await.unwrap();
        let out: serde_json::Value = output(&result);

        assert_eq!(out["entry"]["revision"], "ec6e66608ef682b70db93396b368de30");
        assert_eq!(out["body"], "<h1>home</h1>");
        assert_eq!(out["body_bytes"], 13);
    }
}
