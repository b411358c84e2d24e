//! URL canonicalization and precache url matching.

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid parameter pattern: {0}")]
    InvalidPattern(String),
}

impl From<UrlError> for precache_core::Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::InvalidPattern(msg) => precache_core::Error::InvalidPattern(msg),
            other => precache_core::Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Canonicalize a URL string for consistent cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Parse a site origin, making sure its path ends with `/` so relative
/// manifest urls resolve underneath it.
pub fn parse_origin(input: &str) -> Result<Url, UrlError> {
    let mut origin = canonicalize(input)?;
    origin.set_query(None);
    if !origin.path().ends_with('/') {
        let path = format!("{}/", origin.path());
        origin.set_path(&path);
    }
    Ok(origin)
}

/// Resolve a site-relative manifest url against the origin.
pub fn resolve(origin: &Url, relative: &str) -> Result<Url, UrlError> {
    origin
        .join(relative.trim_start_matches('/'))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// The site-relative form of `url`, or None if it lies outside `origin`.
///
/// The path is percent-decoded so it compares equal to the manifest url it
/// was resolved from (`docs/my%20page.html` yields `docs/my page.html`).
pub fn relative_to(origin: &Url, url: &Url) -> Option<String> {
    if url.origin() != origin.origin() {
        return None;
    }
    let encoded = url.path().strip_prefix(origin.path())?;
    let rel = percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| encoded.to_string());
    Some(match url.query() {
        Some(query) => format!("{rel}?{query}"),
        None => rel.to_string(),
    })
}

/// Produces the candidate urls a request may be precached under.
///
/// Order: the url itself, the url without ignored query parameters, then the
/// directory index and clean-url forms of the latter.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    ignore_params: Vec<Regex>,
    directory_index: Option<String>,
    clean_urls: bool,
}

impl Default for UrlMatcher {
    fn default() -> Self {
        Self {
            ignore_params: vec![Regex::new("^utm_").expect("static pattern")],
            directory_index: Some("index.html".to_string()),
            clean_urls: true,
        }
    }
}

impl UrlMatcher {
    pub fn new<S: AsRef<str>>(
        ignore_params: &[S], directory_index: Option<String>, clean_urls: bool,
    ) -> Result<Self, UrlError> {
        let ignore_params = ignore_params
            .iter()
            .map(|p| Regex::new(p.as_ref()).map_err(|e| UrlError::InvalidPattern(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ignore_params, directory_index, clean_urls })
    }

    pub fn variations(&self, url: &Url) -> Vec<Url> {
        let mut original = url.clone();
        original.set_fragment(None);

        let stripped = self.strip_ignored_params(&original);
        let mut out = vec![original.clone()];
        if stripped != original {
            out.push(stripped.clone());
        }

        if let Some(index) = &self.directory_index
            && stripped.path().ends_with('/')
        {
            let mut with_index = stripped.clone();
            with_index.set_path(&format!("{}{index}", stripped.path()));
            out.push(with_index);
        }

        if self.clean_urls && !stripped.path().ends_with('/') {
            let mut with_ext = stripped.clone();
            with_ext.set_path(&format!("{}.html", stripped.path()));
            out.push(with_ext);
        }

        out
    }

    fn strip_ignored_params(&self, url: &Url) -> Url {
        let mut stripped = url.clone();
        if url.query().is_none() || self.ignore_params.is_empty() {
            return stripped;
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !self.ignore_params.iter().any(|re| re.is_match(key)))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            stripped.set_query(None);
        } else {
            stripped.query_pairs_mut().clear().extend_pairs(kept);
        }
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_default_scheme_and_lowercase_host() {
        let url = canonicalize("EXAMPLE.COM/app.js").unwrap();
        assert_eq!(url.as_str(), "https://example.com/app.js");
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://example.com/page.html?a=1&b=2#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_parse_origin_adds_trailing_slash() {
        let origin = parse_origin("https://example.com/docs").unwrap();
        assert_eq!(origin.as_str(), "https://example.com/docs/");
    }

    #[test]
    fn test_resolve_and_relative_round_trip() {
        let origin = parse_origin("https://jsprimer.net/").unwrap();
        let url = resolve(&origin, "basic/array/index.html").unwrap();
        assert_eq!(url.as_str(), "https://jsprimer.net/basic/array/index.html");
        assert_eq!(relative_to(&origin, &url).as_deref(), Some("basic/array/index.html"));
    }

    #[test]
    fn test_relative_to_decodes_path() {
        let origin = parse_origin("https://jsprimer.net/").unwrap();
        for rel in ["docs/my page.html", "docs/配列.html"] {
            let url = resolve(&origin, rel).unwrap();
            assert_ne!(url.path(), format!("/{rel}"));
            assert_eq!(relative_to(&origin, &url).as_deref(), Some(rel));
        }
    }

    #[test]
    fn test_relative_to_other_origin() {
        let origin = parse_origin("https://jsprimer.net/").unwrap();
        let url = Url::parse("https://cdn.example.com/app.js").unwrap();
        assert_eq!(relative_to(&origin, &url), None);
    }

    #[test]
    fn test_relative_to_outside_base_path() {
        let origin = parse_origin("https://example.com/docs/").unwrap();
        let url = Url::parse("https://example.com/blog/post.html").unwrap();
        assert_eq!(relative_to(&origin, &url), None);
    }

    #[test]
    fn test_variations_strip_tracking_params() {
        let matcher = UrlMatcher::default();
        let url = Url::parse("https://example.com/app.js?utm_source=x&v=2").unwrap();
        let variations: Vec<String> = matcher.variations(&url).into_iter().map(String::from).collect();
        assert_eq!(variations[0], "https://example.com/app.js?utm_source=x&v=2");
        assert_eq!(variations[1], "https://example.com/app.js?v=2");
    }

    #[test]
    fn test_variations_directory_index() {
        let matcher = UrlMatcher::default();
        let url = Url::parse("https://example.com/basic/array/").unwrap();
        let variations: Vec<String> = matcher.variations(&url).into_iter().map(String::from).collect();
        assert_eq!(variations, vec!["https://example.com/basic/array/", "https://example.com/basic/array/index.html"]);
    }

    #[test]
    fn test_variations_clean_urls() {
        let matcher = UrlMatcher::new::<&str>(&[], None, true).unwrap();
        let url = Url::parse("https://example.com/intro").unwrap();
        let variations: Vec<String> = matcher.variations(&url).into_iter().map(String::from).collect();
        assert_eq!(variations, vec!["https://example.com/intro", "https://example.com/intro.html"]);
    }

    #[test]
    fn test_matcher_rejects_bad_pattern() {
        assert!(matches!(UrlMatcher::new(&["("], None, false), Err(UrlError::InvalidPattern(_))));
    }
}
