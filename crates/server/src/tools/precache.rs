//! precache_install and precache_activate tool implementations.

use precache_client::{ActivateReport, InstallReport, OfflineCache};
use precache_core::{AppConfig, CacheDb, CacheEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, load_manifest};
use crate::error::ServerError;

/// Parameters shared by the install and activate tools.
///
/// The manifest comes from `entries` or `manifest_path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PrecacheParams {
    /// Manifest entries, inline.
    #[serde(default)]
    pub entries: Option<Vec<CacheEntry>>,

    /// Path of a manifest JSON file.
    #[serde(default)]
    pub manifest_path: Option<String>,

    /// Base URL the entries resolve against; overrides the configured origin.
    #[serde(default)]
    pub origin: Option<String>,
}

/// Output from the precache_install tool.
#[derive(Debug, Clone, Serialize)]
pub struct PrecacheInstallOutput {
    pub cache_name: String,
    #[serde(flatten)]
    pub report: InstallReport,
}

/// Output from the precache_activate tool.
#[derive(Debug, Clone, Serialize)]
pub struct PrecacheActivateOutput {
    pub cache_name: String,
    #[serde(flatten)]
    pub report: ActivateReport,
}

/// Build the offline cache for a request, honouring an origin override.
pub(crate) fn offline_cache(db: &CacheDb, config: &AppConfig, origin: Option<String>) -> Result<OfflineCache, McpError> {
    let config = match origin {
        Some(origin) => {
            let config = AppConfig { origin: Some(origin), ..config.clone() };
            config.validate().map_err(ServerError::from)?;
            config
        }
        None => {
            config.require_origin().map_err(ServerError::from)?;
            config.clone()
        }
    };
    Ok(OfflineCache::from_config(&config, db.clone())?)
}

/// Implementation of the precache_install tool.
pub async fn install_impl(db: &CacheDb, config: &AppConfig, params: PrecacheParams) -> Result<CallToolResult, McpError> {
    let manifest = load_manifest(params.entries, params.manifest_path.as_deref()).await?;
    let offline = offline_cache(db, config, params.origin)?;

    let report = offline.install(&manifest).await?;
    let cache_name = offline.precacher().cache_name().to_string();
    json_result(&PrecacheInstallOutput { cache_name, report })
}

/// Implementation of the precache_activate tool.
pub async fn activate_impl(db: &CacheDb, config: &AppConfig, params: PrecacheParams) -> Result<CallToolResult, McpError> {
    let manifest = load_manifest(params.entries, params.manifest_path.as_deref()).await?;
    let offline = offline_cache(db, config, params.origin)?;

    let report = offline.activate(&manifest).await?;
    let cache_name = offline.precacher().cache_name().to_string();
    json_result(&PrecacheActivateOutput { cache_name, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REV_1: &str = "ec6e66608ef682b70db93396b368de30";
    const REV_2: &str = "aff1a649713238a1396f9a0eb723f471";

    async fn site() -> MockServer {
        let server = MockServer::start().await;
        for (route, body) in [("/index.html", "home"), ("/app.js", "run()")] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&server)
                .await;
        }
        server
    }

    fn params(server: &MockServer, entries: &[(&str, &str)]) -> PrecacheParams {
        PrecacheParams {
            entries: Some(entries.iter().map(|(u, r)| CacheEntry::new(*u, *r)).collect()),
            manifest_path: None,
            origin: Some(server.uri()),
        }
    }

    #[tokio::test]
    async fn test_install_without_origin_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let params = PrecacheParams { entries: Some(vec![CacheEntry::new("index.html", REV_1)]), ..Default::default() };
        let err = install_impl(&db, &AppConfig::default(), params).await.unwrap_err();
        assert!(err.message.contains("origin"));
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let server = site().await;
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig::default();

        let result = install_impl(&db, &config, params(&server, &[("index.html", REV_1), ("app.js", REV_1)]))
            .await
            .unwrap();
        let installed: serde_json::Value = output(&result);
        assert_eq!(installed["cache_name"], "precache-v1-precache-v2");
        assert_eq!(installed["fetched"].as_array().unwrap().len(), 2);

        let result = activate_impl(&db, &config, params(&server, &[("index.html", REV_2)]))
            .await
            .unwrap();
        let activated: serde_json::Value = output(&result);
        assert_eq!(activated["deleted"], serde_json::json!(["app.js"]));
        assert_eq!(activated["refetched"], serde_json::json!(["index.html"]));
        assert_eq!(activated["failed"], serde_json::json!([]));
    }
}
