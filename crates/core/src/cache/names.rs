//! Cache naming.

use serde::{Deserialize, Serialize};

/// Names of the caches derived from a prefix (and optional suffix).
///
/// `prefix = "js-primer-v1"` yields `js-primer-v1-precache-v2` and
/// `js-primer-v1-runtime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    pub precache: String,
    pub runtime: String,
}

impl CacheNames {
    pub fn new(prefix: &str, suffix: Option<&str>) -> Self {
        Self { precache: Self::compose(prefix, "precache-v2", suffix), runtime: Self::compose(prefix, "runtime", suffix) }
    }

    fn compose(prefix: &str, name: &str, suffix: Option<&str>) -> String {
        [Some(prefix), Some(name), suffix]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self::new("precache-v1", None)
    }
}
