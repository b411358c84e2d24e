//! SQLite-backed cache storage for precached and runtime responses.
//!
//! This module provides a persistent response cache using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Named caches (precache and runtime) derived from a common prefix
//! - Revision tracking for precache entries
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Purge strategies (age, url pattern, LRU)

pub mod connection;
pub mod entries;
pub mod manifests;
pub mod migrations;
pub mod names;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheStats, StoredEntry};
pub use manifests::{ActivatedManifest, MANIFEST_HISTORY};
pub use names::CacheNames;
