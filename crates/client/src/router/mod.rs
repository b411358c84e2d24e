//! Runtime request router.
//!
//! Routes pair a regular expression with a [`Strategy`]. The first route
//! whose pattern matches a request handles it; anything else is passed
//! through to default handling. Patterns are tested against the full url;
//! for cross-origin requests the match must start at the beginning of the url.

use std::sync::Arc;
use std::time::Duration;

use precache_core::{Error, RouteDecl};
use regex::Regex;
use url::Url;

use crate::response::CachedResponse;
use crate::strategies::{self, Strategy, StrategyContext};

/// A pattern bound to a strategy.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Regex,
    strategy: Arc<dyn Strategy>,
}

impl Route {
    pub fn new(pattern: Regex, strategy: Arc<dyn Strategy>) -> Self {
        Self { pattern, strategy }
    }

    /// Compile a declared route.
    pub fn from_decl(decl: &RouteDecl, network_timeout: Option<Duration>) -> Result<Self, Error> {
        Ok(Self::new(decl.compile()?, strategies::build(decl.strategy, network_timeout)))
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    fn matches(&self, url: &Url, same_origin: bool) -> bool {
        match self.pattern.find(url.as_str()) {
            Some(m) => same_origin || m.start() == 0,
            None => false,
        }
    }
}

/// Outcome of routing one request.
#[derive(Debug)]
pub enum RouteOutcome {
    /// A route (or the precache) produced a response.
    Handled(CachedResponse),
    /// No route matched; the request goes to default handling.
    Passthrough,
}

impl RouteOutcome {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            RouteOutcome::Handled(response) => Some(response),
            RouteOutcome::Passthrough => None,
        }
    }
}

/// Ordered set of routes for one site.
#[derive(Debug, Clone, Default)]
pub struct Router {
    origin: Option<Url>,
    routes: Vec<Route>,
}

impl Router {
    /// A router for requests made from `origin` (None treats every request
    /// as same-origin).
    pub fn new(origin: Option<Url>) -> Self {
        Self { origin, routes: Vec::new() }
    }

    pub fn register(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The route that would handle `url`, if any.
    pub fn find(&self, url: &Url) -> Option<&Route> {
        let same_origin = self.origin.as_ref().is_none_or(|origin| origin.origin() == url.origin());
        self.routes.iter().find(|route| route.matches(url, same_origin))
    }

    /// Route a request through the matching strategy.
    pub async fn handle(&self, ctx: &StrategyContext, url: &Url) -> Result<RouteOutcome, Error> {
        let Some(route) = self.find(url) else {
            tracing::trace!(%url, "no route matched");
            return Ok(RouteOutcome::Passthrough);
        };

        tracing::debug!(%url, strategy = %route.strategy.kind(), "routing request");
        let response = route.strategy.handle(ctx, url).await?;
        Ok(RouteOutcome::Handled(response))
    }
}
