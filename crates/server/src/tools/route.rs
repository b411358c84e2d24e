//! route_fetch tool implementation.
//!
//! Resolves a request through the precache and the runtime router.

use precache_client::{ResponseSource, RouteOutcome};
use precache_core::{AppConfig, CacheDb};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use super::precache::offline_cache;

/// Parameters for the route_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteFetchParams {
    /// Absolute url, or a path relative to the origin.
    pub url: String,

    /// Base URL; overrides the configured origin.
    #[serde(default)]
    pub origin: Option<String>,

    /// Include at most this many characters of the body (default: 2000, 0 omits it).
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_max_body_chars() -> usize {
    2000
}

/// Output from the route_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteFetchOutput {
    pub url: String,
    /// False when no route matched and the request passed through.
    pub handled: bool,
    /// "precache", "cache" or "network".
    pub source: Option<String>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub body: Option<String>,
    pub body_truncated: bool,
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Precache => "precache",
    }
}

/// Implementation of the route_fetch tool.
pub async fn route_impl(db: &CacheDb, config: &AppConfig, params: RouteFetchParams) -> Result<CallToolResult, McpError> {
    let offline = offline_cache(db, config, params.origin)?;
    let outcome = offline.handle(&params.url).await?;

    let output = match outcome {
        RouteOutcome::Handled(response) => {
            let text = response.text();
            let body_truncated = text.chars().count() > params.max_body_chars;
            let body = (params.max_body_chars > 0).then(|| text.chars().take(params.max_body_chars).collect());
            RouteFetchOutput {
                url: response.url,
                handled: true,
                source: Some(source_name(response.source).to_string()),
                status: Some(response.status),
                content_type: response.content_type,
                body,
                body_truncated,
            }
        }
        RouteOutcome::Passthrough => RouteFetchOutput {
            url: params.url,
            handled: false,
            source: None,
            status: None,
            content_type: None,
            body: None,
            body_truncated: false,
        },
    };

    json_result(&output)
}
