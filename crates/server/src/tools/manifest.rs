//! manifest_build tool implementation.
//!
//! Walks a built site and emits the precache manifest.

use std::path::PathBuf;

use precache_core::manifest::{SkipReason, SkippedFile};
use precache_core::{AppConfig, BuildReport, CacheEntry, Error, RevisionAlgorithm};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the manifest_build tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManifestBuildParams {
    /// Root directory of the built site.
    pub dir: String,

    /// Prefix prepended to every url (e.g. "docs/").
    #[serde(default)]
    pub url_prefix: Option<String>,

    /// Revision hash algorithm; defaults to the configured one (md5).
    #[serde(default)]
    pub algorithm: Option<RevisionAlgorithm>,

    /// Write the manifest JSON to this path.
    #[serde(default)]
    pub out: Option<String>,
}

/// A file left out of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkippedOutput {
    pub path: String,
    pub reason: String,
}

impl From<&SkippedFile> for SkippedOutput {
    fn from(skipped: &SkippedFile) -> Self {
        let reason = match &skipped.reason {
            SkipReason::TooLarge { size, limit } => format!("{size} bytes exceeds the {limit} byte limit"),
            SkipReason::NotUtf8Path => "path is not valid UTF-8".to_string(),
        };
        Self { path: skipped.path.display().to_string(), reason }
    }
}

/// Output from the manifest_build tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ManifestBuildOutput {
    pub entries: Vec<CacheEntry>,
    pub entry_count: usize,
    /// Total size of the precached files.
    pub total_bytes: u64,
    pub skipped: Vec<SkippedOutput>,
    /// Where the manifest was written, if requested.
    pub written: Option<String>,
}

/// Run a manifest build on the blocking pool.
pub(crate) async fn build_report(
    config: &AppConfig, dir: &str, url_prefix: Option<String>, algorithm: Option<RevisionAlgorithm>,
) -> Result<BuildReport, Error> {
    if dir.trim().is_empty() {
        return Err(Error::InvalidInput("dir cannot be empty".into()));
    }

    let mut builder = config.manifest_builder(PathBuf::from(dir));
    if let Some(prefix) = url_prefix {
        builder = builder.url_prefix(prefix);
    }
    if let Some(algorithm) = algorithm {
        builder = builder.algorithm(algorithm);
    }

    tokio::task::spawn_blocking(move || builder.build())
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Implementation of the manifest_build tool.
pub async fn build_impl(config: &AppConfig, params: ManifestBuildParams) -> Result<CallToolResult, McpError> {
    let report = build_report(config, &params.dir, params.url_prefix, params.algorithm).await?;

    let written = match params.out {
        Some(out) => {
            tokio::fs::write(&out, report.manifest.to_json_pretty()?)
                .await
                .map_err(Error::from)?;
            Some(out)
        }
        None => None,
    };

    let output = ManifestBuildOutput {
        entries: report.manifest.entries().to_vec(),
        entry_count: report.manifest.len(),
        total_bytes: report.total_bytes,
        skipped: report.skipped.iter().map(SkippedOutput::from).collect(),
        written,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output;
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("basic/array")).unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("basic/array/index.html"), "<h1>array</h1>").unwrap();
        fs::write(dir.path().join("sw.js"), "importScripts()").unwrap();
        fs::write(dir.path().join("notes.txt"), "not precached").unwrap();
        dir
    }

    fn params(dir: &tempfile::TempDir) -> ManifestBuildParams {
        ManifestBuildParams {
            dir: dir.path().to_string_lossy().into_owned(),
            url_prefix: None,
            algorithm: None,
            out: None,
        }
    }

    #[tokio::test]
    async fn test_build_lists_matching_files_sorted() {
        let dir = site();
        let result = build_impl(&AppConfig::default(), params(&dir)).await.unwrap();
        let out: ManifestBuildOutput = output(&result);

        let urls: Vec<&str> = out.entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["basic/array/index.html", "index.html"]);
        assert!(out.entries.iter().all(|e| e.revision.len() == 32));
        assert!(out.written.is_none());
    }

    #[tokio::test]
    async fn test_build_writes_manifest_file() {
        let dir = site();
        let out_path = dir.path().join("precache-manifest.json");
        let mut params = params(&dir);
        params.out = Some(out_path.to_string_lossy().into_owned());

        build_impl(&AppConfig::default(), params).await.unwrap();

        let written = fs::read_to_string(&out_path).unwrap();
        let manifest = precache_core::Manifest::from_json(&written).unwrap();
        assert_eq!(manifest.len(), 2);
    }

    #[tokio::test]
    async fn test_build_empty_dir_rejected() {
        let params = ManifestBuildParams { dir: "  ".into(), url_prefix: None, algorithm: None, out: None };
        assert!(build_impl(&AppConfig::default(), params).await.is_err());
    }
}
