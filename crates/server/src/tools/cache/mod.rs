//! Cache-related MCP tools.
//!
//! This module provides tools for interacting with the SQLite cache.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};

use precache_core::AppConfig;

/// Resolve a cache selector: "precache", "runtime" (the default) or a full
/// cache name.
pub(crate) fn cache_name(config: &AppConfig, selector: Option<&str>) -> String {
    let names = config.cache_names();
    match selector.map(str::trim) {
        Some("precache") => names.precache,
        None | Some("") | Some("runtime") => names.runtime,
        Some(other) => other.to_string(),
    }
}
