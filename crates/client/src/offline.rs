//! Offline cache facade: precache first, then the runtime router.

use precache_core::{AppConfig, CacheDb, CacheNames, Error, Manifest};
use url::Url;

use crate::fetch::{FetchClient, FetchConfig, UrlMatcher, canonicalize, parse_origin};
use crate::precache::{ActivateReport, InstallReport, Precacher};
use crate::router::{Route, RouteOutcome, Router};
use crate::strategies::{Expiration, StrategyContext};

/// A site's offline cache: precache consumer plus routed runtime caching.
#[derive(Debug, Clone)]
pub struct OfflineCache {
    precacher: Precacher,
    router: Router,
    runtime: StrategyContext,
}

impl OfflineCache {
    pub fn new(precacher: Precacher, router: Router, runtime: StrategyContext) -> Self {
        Self { precacher, router, runtime }
    }

    /// Wire everything up from configuration.
    ///
    /// Requires `origin` to be configured.
    pub fn from_config(config: &AppConfig, db: CacheDb) -> Result<Self, Error> {
        let origin = config.require_origin().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = parse_origin(origin)?;
        let client = FetchClient::new(FetchConfig::from(config))?;
        let CacheNames { precache, runtime } = config.cache_names();

        let matcher = UrlMatcher::new(
            &config.ignore_url_parameters,
            config.directory_index.clone(),
            config.clean_urls,
        )?;
        let precacher = Precacher::new(db.clone(), client.clone(), origin.clone(), precache)
            .with_concurrency(config.install_concurrency)
            .with_matcher(matcher);

        let mut router = Router::new(Some(origin));
        router.register(Route::from_decl(&config.route()?, config.network_timeout())?);

        let expiration = Expiration { max_entries: config.runtime_max_entries, max_age: config.runtime_max_age() };
        let runtime = StrategyContext::new(db, client, runtime).with_expiration(expiration);

        Ok(Self::new(precacher, router, runtime))
    }

    pub fn precacher(&self) -> &Precacher {
        &self.precacher
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn runtime(&self) -> &StrategyContext {
        &self.runtime
    }

    pub async fn install(&self, manifest: &Manifest) -> Result<InstallReport, Error> {
        self.precacher.install(manifest).await
    }

    pub async fn activate(&self, manifest: &Manifest) -> Result<ActivateReport, Error> {
        self.precacher.activate(manifest).await
    }

    /// Handle a request, resolving site-relative input against the origin.
    pub async fn handle(&self, input: &str) -> Result<RouteOutcome, Error> {
        let url = self.resolve_request(input)?;
        self.handle_url(&url).await
    }

    /// Serve from the precache when possible, otherwise route.
    pub async fn handle_url(&self, url: &Url) -> Result<RouteOutcome, Error> {
        if let Some(response) = self.precacher.lookup(url).await? {
            return Ok(RouteOutcome::Handled(response));
        }
        self.router.handle(&self.runtime, url).await
    }

    fn resolve_request(&self, input: &str) -> Result<Url, Error> {
        let trimmed = input.trim();
        if trimmed.contains("://") {
            return Ok(canonicalize(trimmed)?);
        }
        Ok(crate::fetch::resolve(self.precacher.origin(), trimmed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseSource;
    use precache_core::CacheEntry;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn offline(server: &MockServer) -> OfflineCache {
        let config = AppConfig { origin: Some(server.uri()), ..AppConfig::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        OfflineCache::from_config(&config, db).unwrap()
    }

    #[tokio::test]
    async fn test_from_config_requires_origin() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = OfflineCache::from_config(&AppConfig::default(), db);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_precached_served_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("precached home"))
            .expect(1)
            .mount(&server)
            .await;

        let offline = offline(&server).await;
        let manifest = Manifest::new(vec![CacheEntry::new("index.html", "ec6e66608ef682b70db93396b368de30")]).unwrap();
        offline.install(&manifest).await.unwrap();

        let outcome = offline.handle("index.html").await.unwrap();
        let response = outcome.response().unwrap();
        assert_eq!(response.source, ResponseSource::Precache);
        assert_eq!(response.text(), "precached home");
    }

    #[tokio::test]
    async fn test_unprecached_script_goes_network_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lazy.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("lazy()"))
            .mount(&server)
            .await;

        let offline = offline(&server).await;
        let outcome = offline.handle("lazy.js").await.unwrap();
        assert_eq!(outcome.response().unwrap().source, ResponseSource::Network);

        let url = offline.precacher().origin().join("lazy.js").unwrap();
        assert!(offline.runtime().cached(&url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unrouted_request_passes_through() {
        let server = MockServer::start().await;
        let offline = offline(&server).await;
        let outcome = offline.handle("img/logo.png").await.unwrap();
        assert!(matches!(outcome, RouteOutcome::Passthrough));
    }
}
