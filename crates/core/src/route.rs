//! Declarative routing rules: a url pattern bound to a caching strategy.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Caching strategies a route can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    /// Prefer a fresh network response, fall back to the cache.
    NetworkFirst,
    /// Serve from cache, go to the network on a miss.
    CacheFirst,
    /// Always go to the network.
    NetworkOnly,
    /// Only ever serve from cache.
    CacheOnly,
    /// Serve from cache and refresh it from the network in the background.
    StaleWhileRevalidate,
}

impl StrategyKind {
    /// Name of the strategy factory in the worker's caching library.
    pub fn js_name(self) -> &'static str {
        match self {
            StrategyKind::NetworkFirst => "networkFirst",
            StrategyKind::CacheFirst => "cacheFirst",
            StrategyKind::NetworkOnly => "networkOnly",
            StrategyKind::CacheOnly => "cacheOnly",
            StrategyKind::StaleWhileRevalidate => "staleWhileRevalidate",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.js_name())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    /// Accepts both `networkFirst` and `network-first` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_lowercase();
        match normalized.as_str() {
            "networkfirst" => Ok(StrategyKind::NetworkFirst),
            "cachefirst" => Ok(StrategyKind::CacheFirst),
            "networkonly" => Ok(StrategyKind::NetworkOnly),
            "cacheonly" => Ok(StrategyKind::CacheOnly),
            "stalewhilerevalidate" => Ok(StrategyKind::StaleWhileRevalidate),
            _ => Err(Error::InvalidInput(format!("unknown strategy: {s}"))),
        }
    }
}

/// A routing rule as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RouteDecl {
    /// Regular expression tested against the full request url.
    pub pattern: String,
    pub strategy: StrategyKind,
}

impl RouteDecl {
    pub fn new(pattern: impl Into<String>, strategy: StrategyKind) -> Self {
        Self { pattern: pattern.into(), strategy }
    }

    /// Compile the pattern.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if the pattern is not a valid regex.
    pub fn compile(&self) -> Result<Regex, Error> {
        Regex::new(&self.pattern).map_err(|e| Error::InvalidPattern(e.to_string()))
    }
}

impl Default for RouteDecl {
    /// `.js`, `.html` and `.css` requests go network-first.
    fn default() -> Self {
        Self::new(r"\.(js|html|css)", StrategyKind::NetworkFirst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str_spellings() {
        assert_eq!("networkFirst".parse::<StrategyKind>().unwrap(), StrategyKind::NetworkFirst);
        assert_eq!("network-first".parse::<StrategyKind>().unwrap(), StrategyKind::NetworkFirst);
        assert_eq!("stale_while_revalidate".parse::<StrategyKind>().unwrap(), StrategyKind::StaleWhileRevalidate);
        assert!("fastest".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_strategy_display_round_trips() {
        for kind in [
            StrategyKind::NetworkFirst,
            StrategyKind::CacheFirst,
            StrategyKind::NetworkOnly,
            StrategyKind::CacheOnly,
            StrategyKind::StaleWhileRevalidate,
        ] {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_route_matches_pages_scripts_styles() {
        let re = RouteDecl::default().compile().unwrap();
        assert!(re.is_match("https://jsprimer.net/basic/array/index.html"));
        assert!(re.is_match("https://jsprimer.net/foo.js"));
        assert!(re.is_match("https://jsprimer.net/style.css"));
        assert!(!re.is_match("https://jsprimer.net/foo.png"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = RouteDecl::new("(", StrategyKind::CacheFirst).compile();
        assert!(matches!(result, Err(Error::InvalidPattern(_))));
    }
}
