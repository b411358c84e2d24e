//! MCP tool implementations.
//!
//! This module contains all tools exposed by the precache server.

pub mod cache;
pub mod manifest;
pub mod precache;
pub mod route;
pub mod sw;

use precache_core::{CacheEntry, Error, Manifest};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ServerError;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ServerError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Take a manifest from inline entries or a manifest JSON file.
pub(crate) async fn load_manifest(
    entries: Option<Vec<CacheEntry>>, manifest_path: Option<&str>,
) -> Result<Manifest, McpError> {
    match (entries, manifest_path) {
        (Some(entries), None) => Ok(Manifest::new(entries)?),
        (None, Some(path)) => {
            let json = tokio::fs::read_to_string(path).await.map_err(Error::from)?;
            Ok(Manifest::from_json(&json)?)
        }
        (Some(_), Some(_)) => Err(Error::InvalidInput("pass either entries or manifest_path, not both".into()).into()),
        (None, None) => Err(Error::InvalidInput("one of entries or manifest_path is required".into()).into()),
    }
}
