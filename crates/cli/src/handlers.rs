//! Command handlers.
//!
//! Reports go to stdout as JSON, progress goes through tracing on stderr.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use precache_client::{OfflineCache, RouteOutcome};
use precache_core::{AppConfig, CacheDb, Manifest, RevisionAlgorithm, ServiceWorkerScript};

/// Build the manifest and optionally the worker script.
pub async fn build(
    config: &AppConfig, dir: &Path, out: &Path, sw: Option<&Path>, url_prefix: Option<String>,
    algorithm: Option<RevisionAlgorithm>,
) -> Result<Manifest> {
    let mut builder = config.manifest_builder(dir);
    if let Some(prefix) = url_prefix {
        builder = builder.url_prefix(prefix);
    }
    if let Some(algorithm) = algorithm {
        builder = builder.algorithm(algorithm);
    }

    let report = tokio::task::spawn_blocking(move || builder.build()).await??;
    tokio::fs::write(out, report.manifest.to_json_pretty()?)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("{} entries ({} bytes) -> {}", report.manifest.len(), report.total_bytes, out.display());

    if let Some(sw) = sw {
        let script = ServiceWorkerScript::from_config(config)?.render(&report.manifest)?;
        tokio::fs::write(sw, script)
            .await
            .with_context(|| format!("failed to write {}", sw.display()))?;
        println!("service worker -> {}", sw.display());
    }

    Ok(report.manifest)
}

async fn read_manifest(path: &Path) -> Result<Manifest> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Manifest::from_json(&json)?)
}

fn offline_cache(config: &AppConfig, db: CacheDb, origin: Option<String>) -> Result<OfflineCache> {
    let config = match origin {
        Some(origin) => AppConfig { origin: Some(origin), ..config.clone() },
        None => config.clone(),
    };
    config.validate()?;
    config.require_origin()?;
    Ok(OfflineCache::from_config(&config, db)?)
}

pub async fn install(config: &AppConfig, db: CacheDb, manifest: &Path, origin: Option<String>) -> Result<()> {
    let manifest = read_manifest(manifest).await?;
    let report = offline_cache(config, db, origin)?.install(&manifest).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.failed.is_empty() {
        bail!("{} of {} entries failed to install", report.failed.len(), manifest.len());
    }
    Ok(())
}

pub async fn activate(config: &AppConfig, db: CacheDb, manifest: &Path, origin: Option<String>) -> Result<()> {
    let manifest = read_manifest(manifest).await?;
    let report = offline_cache(config, db, origin)?.activate(&manifest).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.failed.is_empty() {
        bail!("{} entries failed to refresh", report.failed.len());
    }
    Ok(())
}

pub async fn fetch(config: &AppConfig, db: CacheDb, url: &str, origin: Option<String>) -> Result<()> {
    match offline_cache(config, db, origin)?.handle(url).await? {
        RouteOutcome::Handled(response) => {
            eprintln!("{} {} ({:?})", response.status, response.url, response.source);
            println!("{}", response.text());
        }
        RouteOutcome::Passthrough => eprintln!("{url}: no route matched"),
    }
    Ok(())
}

/// Options of the purge command.
#[derive(Debug, Default)]
pub struct PurgeOptions {
    pub cache: String,
    pub older_than_days: Option<i64>,
    pub url_pattern: Option<String>,
    pub max_entries: Option<usize>,
    pub all: bool,
}

pub async fn purge(config: &AppConfig, db: &CacheDb, opts: PurgeOptions) -> Result<u64> {
    if opts.older_than_days.is_none() && opts.url_pattern.is_none() && opts.max_entries.is_none() && !opts.all {
        bail!("nothing to purge: pass --older-than-days, --url-pattern, --max-entries or --all");
    }

    let names = config.cache_names();
    let cache = match opts.cache.as_str() {
        "precache" => names.precache,
        "runtime" => names.runtime,
        other => other.to_string(),
    };

    let mut deleted = 0;
    if opts.all {
        deleted += db.clear_cache(&cache).await?;
    }
    if let Some(days) = opts.older_than_days {
        deleted += db.purge_stored_before(&cache, Utc::now() - Duration::days(days.max(0))).await?;
    }
    if let Some(pattern) = opts.url_pattern.as_deref() {
        deleted += db.purge_by_url_pattern(Some(&cache), pattern).await?;
    }
    if let Some(max) = opts.max_entries {
        deleted += db.purge_lru(&cache, max).await?;
    }

    println!("{deleted} entries purged from {cache}");
    Ok(deleted)
}

pub async fn stats(db: &CacheDb) -> Result<()> {
    let stats = db.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use precache_core::StoredEntry;
    use std::fs;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_build_writes_manifest_and_worker() {
        let site = tempfile::tempdir().unwrap();
        fs::write(site.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(site.path().join("app.js"), "run()").unwrap();
        let out = site.path().join("manifest.json");
        let sw = site.path().join("sw.js");

        let manifest = build(&AppConfig::default(), site.path(), &out, Some(&sw), None, None)
            .await
            .unwrap();

        assert_eq!(manifest.urls().collect::<Vec<_>>(), vec!["app.js", "index.html"]);
        assert_eq!(Manifest::from_json(&fs::read_to_string(&out).unwrap()).unwrap(), manifest);
        assert!(fs::read_to_string(&sw).unwrap().contains("precacheAndRoute"));
    }

    #[tokio::test]
    async fn test_install_from_manifest_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("home"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, r#"[{"url":"index.html","revision":"ec6e66608ef682b70db93396b368de30"}]"#).unwrap();

        let config = AppConfig::default();
        let db = CacheDb::open_in_memory().await.unwrap();
        install(&config, db.clone(), &manifest_path, Some(server.uri())).await.unwrap();

        let stored = db.get_entry(&config.cache_names().precache, "index.html").await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_install_requires_origin() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, "[]").unwrap();

        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(install(&AppConfig::default(), db, &manifest_path, None).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_selects_cache() {
        let config = AppConfig::default();
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&StoredEntry::new(config.cache_names().runtime, "https://a.test/x.js", 200, vec![]))
            .await
            .unwrap();

        let opts = PurgeOptions { cache: "runtime".into(), all: true, ..Default::default() };
        assert_eq!(purge(&config, &db, opts).await.unwrap(), 1);

        let opts = PurgeOptions { cache: "runtime".into(), ..Default::default() };
        assert!(purge(&config, &db, opts).await.is_err());
    }
}
