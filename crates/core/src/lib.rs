//! Core types and shared functionality for precache.
//!
//! This crate provides:
//! - Precache manifest model, revision hashing and the build-time manifest builder
//! - Cache store implementation with SQLite backend
//! - Service worker script rendering
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod revision;
pub mod route;
pub mod sw;

pub use cache::{CacheDb, CacheNames, StoredEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::{BuildReport, CacheEntry, Manifest, ManifestBuilder, ManifestDiff};
pub use revision::{RevisionAlgorithm, compute_revision};
pub use route::{RouteDecl, StrategyKind};
pub use sw::ServiceWorkerScript;
