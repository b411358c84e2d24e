//! Client side of precache.
//!
//! This crate provides the HTTP fetch pipeline, the precache manifest
//! consumer (install, activate, match), the runtime router with its caching
//! strategies, and the [`OfflineCache`] facade shared by the server and CLI.

pub mod fetch;
pub mod offline;
pub mod precache;
pub mod response;
pub mod router;
pub mod strategies;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, UrlError, UrlMatcher};
pub use offline::OfflineCache;
pub use precache::{ActivateReport, FailedEntry, InstallReport, Precacher};
pub use response::{CachedResponse, ResponseSource};
pub use router::{Route, RouteOutcome, Router};
pub use strategies::{Expiration, Strategy, StrategyContext};
