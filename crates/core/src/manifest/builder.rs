//! Build-time manifest generation.
//!
//! Walks the site's output directory, fingerprints every matching file and
//! emits a manifest sorted by url, so an unchanged tree always yields an
//! identical manifest.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use super::{CacheEntry, Manifest};
use crate::Error;
use crate::revision::{RevisionAlgorithm, compute_revision};

/// Extensions precached by default: pages, scripts, styles, images and fonts.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "html", "js", "css", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2", "ttf", "eot", "json",
];

/// Paths skipped by default. The worker script never precaches itself.
pub const DEFAULT_IGNORES: &[&str] = &["node_modules/", "sw.js"];

/// Files above this size are left out of the manifest (2 MiB).
pub const DEFAULT_MAXIMUM_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Why a file was left out of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    NotUtf8Path,
}

/// A matching file that was not added to the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Output of a manifest build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub manifest: Manifest,
    pub skipped: Vec<SkippedFile>,
    /// Sum of the sizes of all precached files.
    pub total_bytes: u64,
}

/// Generates a [`Manifest`] from a directory tree.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    root: PathBuf,
    extensions: Vec<String>,
    ignores: Vec<String>,
    maximum_file_size: u64,
    algorithm: RevisionAlgorithm,
    url_prefix: Option<String>,
}

impl ManifestBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignores: DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect(),
            maximum_file_size: DEFAULT_MAXIMUM_FILE_SIZE,
            algorithm: RevisionAlgorithm::default(),
            url_prefix: None,
        }
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn ignores<I, S>(mut self, ignores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignores = ignores.into_iter().map(Into::into).collect();
        self
    }

    pub fn maximum_file_size(mut self, bytes: u64) -> Self {
        self.maximum_file_size = bytes;
        self
    }

    pub fn algorithm(mut self, algorithm: RevisionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Prepend `prefix` to every generated url (e.g. `docs/`).
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.url_prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    /// Walk the root directory and fingerprint every matching file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the root cannot be read or a matching file
    /// cannot be opened.
    pub fn build(&self) -> Result<BuildReport, Error> {
        if !self.root.is_dir() {
            return Err(Error::InvalidInput(format!("{} is not a directory", self.root.display())));
        }

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        let mut total_bytes = 0u64;

        for dent in WalkDir::new(&self.root).follow_links(true) {
            let dent = dent.map_err(|e| Error::Io(e.into()))?;
            if !dent.file_type().is_file() {
                continue;
            }

            let path = dent.path();
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let Some(url) = relative_url(relative) else {
                skipped.push(SkippedFile { path: path.to_path_buf(), reason: SkipReason::NotUtf8Path });
                continue;
            };

            if !self.matches_extension(&url) || self.is_ignored(&url) {
                continue;
            }

            let size = dent.metadata().map_err(|e| Error::Io(e.into()))?.len();
            if size > self.maximum_file_size {
                tracing::warn!(url = %url, size, limit = self.maximum_file_size, "file too large to precache");
                skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: SkipReason::TooLarge { size, limit: self.maximum_file_size },
                });
                continue;
            }

            let bytes = std::fs::read(path)?;
            total_bytes += bytes.len() as u64;
            let revision = compute_revision(&bytes, self.algorithm);
            let url = match &self.url_prefix {
                Some(prefix) => format!("{prefix}{url}"),
                None => url,
            };
            entries.push(CacheEntry { url, revision });
        }

        entries.sort_by(|a, b| a.url.cmp(&b.url));

        tracing::info!(
            root = %self.root.display(),
            entries = entries.len(),
            skipped = skipped.len(),
            total_bytes,
            "built precache manifest"
        );

        Ok(BuildReport { manifest: Manifest::new(entries)?, skipped, total_bytes })
    }

    fn matches_extension(&self, url: &str) -> bool {
        Path::new(url)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }

    fn is_ignored(&self, url: &str) -> bool {
        let file_name = url.rsplit('/').next().unwrap_or(url);
        self.ignores.iter().any(|pattern| {
            if let Some(dir) = pattern.strip_suffix('/') {
                url.starts_with(pattern.as_str()) || url.split('/').any(|segment| segment == dir)
            } else {
                url == pattern || file_name == pattern
            }
        })
    }
}

/// Join path components with `/`, independent of the host separator.
fn relative_url(relative: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    parts.map(|p| p.join("/"))
}
