//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::route::{RouteDecl, StrategyKind};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `user_agent` is empty
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `network_timeout_ms` is less than 100ms or not below `timeout_ms`
    /// - `route_pattern` does not compile or `strategy` is unknown
    /// - `install_concurrency` is outside 1..=64
    /// - `origin` is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.trim().is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if let Some(network_timeout_ms) = self.network_timeout_ms {
            if network_timeout_ms < 100 {
                return Err(invalid("network_timeout_ms", "must be at least 100ms"));
            }
            if network_timeout_ms >= self.timeout_ms {
                return Err(invalid("network_timeout_ms", "must be lower than timeout_ms"));
            }
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let strategy: StrategyKind = self
            .strategy
            .parse()
            .map_err(|_| invalid("strategy", format!("unknown strategy '{}'", self.strategy)))?;
        RouteDecl::new(&self.route_pattern, strategy)
            .compile()
            .map_err(|e| invalid("route_pattern", e.to_string()))?;

        if !(1..=64).contains(&self.install_concurrency) {
            return Err(invalid("install_concurrency", "must be between 1 and 64"));
        }

        if let Some(origin) = &self.origin
            && !(origin.starts_with("http://") || origin.starts_with("https://"))
        {
            return Err(invalid("origin", "must be an http(s) URL"));
        }

        for pattern in &self.ignore_url_parameters {
            regex::Regex::new(pattern).map_err(|e| invalid("ignore_url_parameters", e.to_string()))?;
        }

        if self.runtime_max_entries == Some(0) {
            tracing::warn!("runtime_max_entries = 0 evicts every runtime response right after it is stored");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_network_timeout_not_below_timeout() {
        let config = AppConfig { network_timeout_ms: Some(20_000), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "network_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_prefix() {
        let config = AppConfig { cache_prefix: " ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_prefix"));
    }

    #[test]
    fn test_validate_bad_route_pattern() {
        let config = AppConfig { route_pattern: r"\.(js|html".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "route_pattern"));
    }

    #[test]
    fn test_validate_unknown_strategy() {
        let config = AppConfig { strategy: "fastest".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "strategy"));
    }

    #[test]
    fn test_validate_install_concurrency() {
        let config = AppConfig { install_concurrency: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "install_concurrency"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: Some("ftp://example.com".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
