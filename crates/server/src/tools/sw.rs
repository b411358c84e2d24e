//! sw_render tool implementation.
//!
//! Renders the service worker script for a manifest.

use precache_core::{AppConfig, CacheEntry, Error, ServiceWorkerScript};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::manifest::build_report;
use super::{json_result, load_manifest};

/// Parameters for the sw_render tool.
///
/// Exactly one manifest source must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwRenderParams {
    /// Manifest entries, inline.
    #[serde(default)]
    pub entries: Option<Vec<CacheEntry>>,

    /// Path of a manifest JSON file.
    #[serde(default)]
    pub manifest_path: Option<String>,

    /// Site directory to build the manifest from.
    #[serde(default)]
    pub dir: Option<String>,

    /// Write the script to this path.
    #[serde(default)]
    pub out: Option<String>,
}

/// Output from the sw_render tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwRenderOutput {
    pub script: String,
    pub entry_count: usize,
    pub written: Option<String>,
}

/// Implementation of the sw_render tool.
pub async fn render_impl(config: &AppConfig, params: SwRenderParams) -> Result<CallToolResult, McpError> {
    let manifest = match params.dir {
        Some(dir) if params.entries.is_none() && params.manifest_path.is_none() => {
            build_report(config, &dir, None, None).await?.manifest
        }
        Some(_) => {
            return Err(Error::InvalidInput("dir cannot be combined with entries or manifest_path".into()).into());
        }
        None => load_manifest(params.entries, params.manifest_path.as_deref()).await?,
    };

    let script = ServiceWorkerScript::from_config(config)?.render(&manifest)?;

    let written = match params.out {
        Some(out) => {
            tokio::fs::write(&out, &script).await.map_err(Error::from)?;
            tracing::info!(path = %out, entries = manifest.len(), "service worker written");
            Some(out)
        }
        None => None,
    };

    json_result(&SwRenderOutput { script, entry_count: manifest.len(), written })
}
