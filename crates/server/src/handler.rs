//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use precache_core::{AppConfig, CacheDb};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::manifest::{ManifestBuildParams, build_impl};
use crate::tools::precache::{PrecacheParams, activate_impl, install_impl};
use crate::tools::route::{RouteFetchParams, route_impl};
use crate::tools::sw::{SwRenderParams, render_impl};

/// The main MCP server handler for precache.
#[derive(Clone)]
pub struct PrecacheServer {
    tool_router: ToolRouter<Self>,
    config: Arc<AppConfig>,
    db: CacheDb,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PrecacheServer {
    /// Create a new server handler over an opened cache store.
    pub fn new(config: AppConfig, db: CacheDb) -> Self {
        Self { tool_router: Self::tool_router(), config: Arc::new(config), db }
    }

    #[tool(
        description = "Walk a built site directory and produce the precache manifest: one {url, revision} entry per matching file, sorted by url. Optionally writes the manifest JSON to `out`."
    )]
    async fn manifest_build(&self, params: Parameters<ManifestBuildParams>) -> Result<CallToolResult, McpError> {
        build_impl(&self.config, params.0).await
    }

    #[tool(
        description = "Render the service worker script that precaches a manifest and registers the configured route. The manifest comes from `entries`, `manifest_path` or a site `dir`."
    )]
    async fn sw_render(&self, params: Parameters<SwRenderParams>) -> Result<CallToolResult, McpError> {
        render_impl(&self.config, params.0).await
    }

    #[tool(
        description = "Install a manifest: fetch every entry missing from the precache or stored under another revision. Failed entries are reported, not retried."
    )]
    async fn precache_install(&self, params: Parameters<PrecacheParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.db, &self.config, params.0).await
    }

    #[tool(
        description = "Activate a manifest: delete precached urls it no longer lists, refetch stale revisions and record it as the active manifest."
    )]
    async fn precache_activate(&self, params: Parameters<PrecacheParams>) -> Result<CallToolResult, McpError> {
        activate_impl(&self.db, &self.config, params.0).await
    }

    #[tool(
        description = "Request a url the way the site would: precache first, then the matching route's strategy (network-first by default). Unrouted urls pass through."
    )]
    async fn route_fetch(&self, params: Parameters<RouteFetchParams>) -> Result<CallToolResult, McpError> {
        route_impl(&self.db, &self.config, params.0).await
    }

    #[tool(description = "Read one stored entry from the precache or runtime cache.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, &self.config, params.0).await
    }

    #[tool(description = "Purge cache entries by age, url pattern or count, or clear a cache entirely.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.db, &self.config, params.0).await
    }
}

impl ServerHandler for PrecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "precache-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
