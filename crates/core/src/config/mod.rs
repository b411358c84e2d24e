//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRECACHE_*)
//! 2. TOML config file (if PRECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::CacheNames;
use crate::manifest::ManifestBuilder;
use crate::revision::RevisionAlgorithm;
use crate::route::RouteDecl;

mod validation;

pub use validation::ConfigError;

/// Default workbox-sw loader referenced by generated worker scripts.
pub const DEFAULT_WORKBOX_CDN_URL: &str = "https://storage.googleapis.com/workbox-cdn/releases/3.2.0/workbox-sw.js";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRECACHE_*)
/// 2. TOML config file (if PRECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix every cache name is derived from.
    ///
    /// Set via PRECACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Optional suffix appended to cache names.
    #[serde(default)]
    pub cache_suffix: Option<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via PRECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL manifest urls are resolved against (e.g. `https://jsprimer.net/`).
    ///
    /// Set via PRECACHE_ORIGIN environment variable.
    /// Required only for install, activate and routed fetches.
    #[serde(default)]
    pub origin: Option<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Network-first timeout in milliseconds before falling back to cache.
    ///
    /// Unset means the request timeout alone bounds the network attempt.
    #[serde(default)]
    pub network_timeout_ms: Option<u64>,

    /// Regular expression selecting requests handled by `strategy`.
    #[serde(default = "default_route_pattern")]
    pub route_pattern: String,

    /// Strategy selector name (`networkFirst`, `cacheFirst`, ...).
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Maximum concurrent fetches during install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Query parameter patterns ignored when matching precached urls.
    #[serde(default = "default_ignore_url_parameters")]
    pub ignore_url_parameters: Vec<String>,

    /// File served for directory urls from the precache.
    #[serde(default = "default_directory_index")]
    pub directory_index: Option<String>,

    /// Match `/page` against a precached `/page.html`.
    #[serde(default = "default_true")]
    pub clean_urls: bool,

    /// Runtime cache entry cap; oldest entries are evicted first.
    #[serde(default)]
    pub runtime_max_entries: Option<usize>,

    /// Runtime cache entry lifetime in seconds.
    #[serde(default)]
    pub runtime_max_age_seconds: Option<u64>,

    /// File extensions included by the manifest builder.
    #[serde(default = "default_glob_extensions")]
    pub glob_extensions: Vec<String>,

    /// Paths skipped by the manifest builder.
    #[serde(default = "default_glob_ignores")]
    pub glob_ignores: Vec<String>,

    /// Files larger than this are left out of the manifest.
    #[serde(default = "default_maximum_file_size")]
    pub maximum_file_size: u64,

    /// Digest used for revisions.
    #[serde(default)]
    pub revision_algorithm: RevisionAlgorithm,

    /// Caching library loader imported by the generated worker.
    #[serde(default = "default_workbox_cdn_url")]
    pub workbox_cdn_url: String,

    /// Emit `skipWaiting()` in the generated worker.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Emit `clientsClaim()` in the generated worker.
    #[serde(default = "default_true")]
    pub clients_claim: bool,

    /// Queue Google Analytics hits made while offline and replay them later.
    ///
    /// Set via PRECACHE_OFFLINE_GOOGLE_ANALYTICS environment variable.
    #[serde(default = "default_true")]
    pub offline_google_analytics: bool,
}

fn default_cache_prefix() -> String {
    "precache-v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./precache.sqlite")
}

fn default_user_agent() -> String {
    "precache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_route_pattern() -> String {
    r"\.(js|html|css)".into()
}

fn default_strategy() -> String {
    "networkFirst".into()
}

fn default_install_concurrency() -> usize {
    4
}

fn default_ignore_url_parameters() -> Vec<String> {
    vec!["^utm_".into()]
}

fn default_directory_index() -> Option<String> {
    Some("index.html".into())
}

fn default_glob_extensions() -> Vec<String> {
    crate::manifest::DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_glob_ignores() -> Vec<String> {
    crate::manifest::DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect()
}

fn default_maximum_file_size() -> u64 {
    crate::manifest::DEFAULT_MAXIMUM_FILE_SIZE
}

fn default_workbox_cdn_url() -> String {
    DEFAULT_WORKBOX_CDN_URL.into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            cache_suffix: None,
            db_path: default_db_path(),
            origin: None,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            network_timeout_ms: None,
            route_pattern: default_route_pattern(),
            strategy: default_strategy(),
            install_concurrency: default_install_concurrency(),
            ignore_url_parameters: default_ignore_url_parameters(),
            directory_index: default_directory_index(),
            clean_urls: true,
            runtime_max_entries: None,
            runtime_max_age_seconds: None,
            glob_extensions: default_glob_extensions(),
            glob_ignores: default_glob_ignores(),
            maximum_file_size: default_maximum_file_size(),
            revision_algorithm: RevisionAlgorithm::default(),
            workbox_cdn_url: default_workbox_cdn_url(),
            skip_waiting: true,
            clients_claim: true,
            offline_google_analytics: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Network-first timeout, if configured.
    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_ms.map(Duration::from_millis)
    }

    /// Runtime cache entry lifetime, if configured.
    pub fn runtime_max_age(&self) -> Option<Duration> {
        self.runtime_max_age_seconds.map(Duration::from_secs)
    }

    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, self.cache_suffix.as_deref())
    }

    /// The configured routing rule.
    pub fn route(&self) -> Result<RouteDecl, Error> {
        Ok(RouteDecl::new(&self.route_pattern, self.strategy.parse()?))
    }

    /// A manifest builder for `root` using the configured globbing options.
    pub fn manifest_builder(&self, root: impl Into<PathBuf>) -> ManifestBuilder {
        ManifestBuilder::new(root)
            .extensions(self.glob_extensions.iter().cloned())
            .ignores(self.glob_ignores.iter().cloned())
            .maximum_file_size(self.maximum_file_size)
            .algorithm(self.revision_algorithm)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRECACHE_`
    /// 2. TOML file from `PRECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The origin manifest urls resolve against (deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no origin is configured.
    pub fn require_origin(&self) -> Result<&str, ConfigError> {
        self.origin.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "origin".into(),
            hint: "Set PRECACHE_ORIGIN environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_prefix, "precache-v1");
        assert_eq!(config.db_path, PathBuf::from("./precache.sqlite"));
        assert_eq!(config.user_agent, "precache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.route_pattern, r"\.(js|html|css)");
        assert_eq!(config.strategy, "networkFirst");
        assert_eq!(config.install_concurrency, 4);
        assert_eq!(config.directory_index.as_deref(), Some("index.html"));
        assert_eq!(config.revision_algorithm, RevisionAlgorithm::Md5);
        assert!(config.network_timeout_ms.is_none());
        assert!(config.offline_google_analytics);
        assert!(config.origin.is_none());
        assert!(config.clean_urls);
    }

    #[test]
    fn test_timeout_durations() {
        let config = AppConfig { network_timeout_ms: Some(3_000), ..Default::default() };
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.network_timeout(), Some(Duration::from_millis(3_000)));
        assert_eq!(config.runtime_max_age(), None);
    }

    #[test]
    fn test_cache_names_from_config() {
        let config = AppConfig { cache_prefix: "js-primer-v1".into(), ..Default::default() };
        assert_eq!(config.cache_names().precache, "js-primer-v1-precache-v2");
    }

    #[test]
    fn test_require_origin_missing() {
        let config = AppConfig::default();
        let result = config.require_origin();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_origin_present() {
        let config = AppConfig { origin: Some("https://jsprimer.net/".into()), ..Default::default() };
        assert_eq!(config.require_origin().unwrap(), "https://jsprimer.net/");
    }

    #[test]
    fn test_load_from_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "precache.toml",
                r#"
                cache_prefix = "js-primer-v1"
                origin = "https://jsprimer.net/"
                strategy = "cacheFirst"
                "#,
            )?;
            jail.set_env("PRECACHE_CONFIG_FILE", "precache.toml");
            jail.set_env("PRECACHE_STRATEGY", "networkFirst");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_prefix, "js-primer-v1");
            assert_eq!(config.origin.as_deref(), Some("https://jsprimer.net/"));
            assert_eq!(config.strategy, "networkFirst");
            Ok(())
        });
    }
}
