//! Service worker script generation.
//!
//! Renders the worker the build step emits: it loads the caching library,
//! names the caches, precaches the manifest and registers the routing rules.

use std::fmt::Write as _;

use crate::config::{AppConfig, DEFAULT_WORKBOX_CDN_URL};
use crate::manifest::Manifest;
use crate::route::RouteDecl;
use crate::Error;

/// Settings for the generated worker script.
#[derive(Debug, Clone)]
pub struct ServiceWorkerScript {
    pub cdn_url: String,
    pub cache_prefix: String,
    pub cache_suffix: Option<String>,
    pub skip_waiting: bool,
    pub clients_claim: bool,
    /// Emit `googleAnalytics.initialize()` for offline analytics.
    pub google_analytics: bool,
    pub routes: Vec<RouteDecl>,
}

impl Default for ServiceWorkerScript {
    fn default() -> Self {
        Self {
            cdn_url: DEFAULT_WORKBOX_CDN_URL.to_string(),
            cache_prefix: "precache-v1".to_string(),
            cache_suffix: None,
            skip_waiting: true,
            clients_claim: true,
            google_analytics: true,
            routes: vec![RouteDecl::default()],
        }
    }
}

impl ServiceWorkerScript {
    /// Script settings taken from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            cdn_url: config.workbox_cdn_url.clone(),
            cache_prefix: config.cache_prefix.clone(),
            cache_suffix: config.cache_suffix.clone(),
            skip_waiting: config.skip_waiting,
            clients_claim: config.clients_claim,
            google_analytics: config.offline_google_analytics,
            routes: vec![config.route()?],
        })
    }

    /// Render the worker script for `manifest`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a route pattern does not compile.
    pub fn render(&self, manifest: &Manifest) -> Result<String, Error> {
        let mut out = String::new();

        // `write!` into a String cannot fail.
        let _ = writeln!(out, "// workbox init setting");
        let _ = writeln!(out, "importScripts({});", js_string(&self.cdn_url)?);
        let _ = writeln!(out);

        let mut names = format!("prefix: {}", js_string(&self.cache_prefix)?);
        if let Some(suffix) = &self.cache_suffix {
            let _ = write!(names, ", suffix: {}", js_string(suffix)?);
        }
        let _ = writeln!(out, "workbox.core.setCacheNameDetails({{ {names} }});");
        if self.google_analytics {
            let _ = writeln!(out, "workbox.googleAnalytics.initialize();");
        }
        if self.skip_waiting {
            let _ = writeln!(out, "workbox.skipWaiting();");
        }
        if self.clients_claim {
            let _ = writeln!(out, "workbox.clientsClaim();");
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "workbox.precaching.suppressWarnings();");
        let _ = writeln!(out, "workbox.precaching.precacheAndRoute({});", manifest.to_json_pretty()?);

        for route in &self.routes {
            route.compile()?;
            let _ = writeln!(out);
            let _ = writeln!(out, "workbox.routing.registerRoute(");
            let _ = writeln!(out, "    {},", js_regex_literal(&route.pattern));
            let _ = writeln!(out, "    workbox.strategies.{}()", route.strategy.js_name());
            let _ = writeln!(out, ");");
        }

        Ok(out)
    }
}

fn js_string(value: &str) -> Result<String, Error> {
    Ok(serde_json::to_string(value)?)
}

/// Wrap a pattern in `/.../`, escaping bare forward slashes.
fn js_regex_literal(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('/');
    let mut escaped = false;
    for c in pattern.chars() {
        if c == '/' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out.push('/');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::CacheEntry;
    use crate::route::StrategyKind;

    fn manifest() -> Manifest {
        Manifest::new(vec![
            CacheEntry::new("basic/array/index.html", "ec6e66608ef682b70db93396b368de30"),
            CacheEntry::new("basic/async/demo/Task-error.js", "0aebcda60c6f4d3ddf6f17bb9288f53d"),
        ])
        .unwrap()
    }

    #[test]
    fn test_render_default_script() {
        let script = ServiceWorkerScript { cache_prefix: "js-primer-v1".into(), ..Default::default() };
        let js = script.render(&manifest()).unwrap();

        assert!(js.contains(r#"importScripts("https://storage.googleapis.com/workbox-cdn/releases/3.2.0/workbox-sw.js");"#));
        assert!(js.contains(r#"workbox.core.setCacheNameDetails({ prefix: "js-primer-v1" });"#));
        assert!(js.contains(
            "workbox.core.setCacheNameDetails({ prefix: \"js-primer-v1\" });\nworkbox.googleAnalytics.initialize();\nworkbox.skipWaiting();\nworkbox.clientsClaim();\n"
        ));
        assert!(js.contains("workbox.clientsClaim();"));
        assert!(js.contains(r#""url": "basic/array/index.html""#));
        assert!(js.contains(r#""revision": "0aebcda60c6f4d3ddf6f17bb9288f53d""#));
        assert!(js.contains("    /\\.(js|html|css)/,\n    workbox.strategies.networkFirst()\n);"));
    }

    #[test]
    fn test_render_embeds_manifest_that_parses_back() {
        let js = ServiceWorkerScript::default().render(&manifest()).unwrap();
        let start = js.find("precacheAndRoute(").unwrap() + "precacheAndRoute(".len();
        let end = js.find(");\n\nworkbox.routing").unwrap();
        let parsed = Manifest::from_json(&js[start..end]).unwrap();
        assert_eq!(parsed, manifest());
    }

    #[test]
    fn test_render_optional_lifecycle_calls() {
        let script = ServiceWorkerScript {
            skip_waiting: false,
            clients_claim: false,
            google_analytics: false,
            cache_suffix: Some("v2".into()),
            ..Default::default()
        };
        let js = script.render(&manifest()).unwrap();
        assert!(!js.contains("skipWaiting"));
        assert!(!js.contains("clientsClaim"));
        assert!(!js.contains("googleAnalytics"));
        assert!(js.contains(r#"{ prefix: "precache-v1", suffix: "v2" }"#));
    }

    #[test]
    fn test_render_rejects_bad_pattern() {
        let script = ServiceWorkerScript { routes: vec![RouteDecl::new("(", StrategyKind::CacheFirst)], ..Default::default() };
        assert!(matches!(script.render(&manifest()), Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_js_regex_literal_escapes_slashes() {
        assert_eq!(js_regex_literal(r"\.(js|css)"), r"/\.(js|css)/");
        assert_eq!(js_regex_literal("/api/.*"), r"/\/api\/.*/");
        assert_eq!(js_regex_literal(r"a\/b"), r"/a\/b/");
    }
}
