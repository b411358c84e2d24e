//! Precache manifest model.
//!
//! A manifest is an ordered list of `{url, revision}` pairs describing every
//! static asset to cache ahead of use. Urls are site-relative and unique; the
//! manifest is regenerated on every build and fully replaces the previous one.

mod builder;

pub use builder::{
    BuildReport, DEFAULT_EXTENSIONS, DEFAULT_IGNORES, DEFAULT_MAXIMUM_FILE_SIZE, ManifestBuilder, SkipReason, SkippedFile,
};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A single precache manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntry {
    /// Site-relative path, `/`-separated, no leading slash.
    pub url: String,
    /// Content fingerprint of the file at `url`.
    pub revision: String,
}

impl CacheEntry {
    pub fn new(url: impl Into<String>, revision: impl Into<String>) -> Self {
        Self { url: url.into(), revision: revision.into() }
    }
}

/// Ordered list of cache entries with unique urls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CacheEntry>", into = "Vec<CacheEntry>")]
pub struct Manifest {
    entries: Vec<CacheEntry>,
}

impl Manifest {
    /// Build a manifest, rejecting duplicate urls and malformed entries.
    pub fn new(entries: Vec<CacheEntry>) -> Result<Self, Error> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.url.trim().is_empty() {
                return Err(Error::InvalidInput("manifest entry has an empty url".into()));
            }
            if entry.revision.trim().is_empty() {
                return Err(Error::InvalidRevision(format!("empty revision ({})", entry.url)));
            }
            if !seen.insert(entry.url.as_str()) {
                return Err(Error::DuplicateUrl(entry.url.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Parse the JSON array form `[{"url": ..., "revision": ...}, ...]`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let entries: Vec<CacheEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CacheEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| e.url == url)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.url.as_str())
    }

    /// Compare this manifest against previously stored `(url, revision)` pairs.
    ///
    /// Entries in `added`, `changed` and `unchanged` keep manifest order;
    /// `removed` keeps the order of `previous`.
    pub fn diff<'a, I>(&self, previous: I) -> ManifestDiff
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let previous: Vec<(&str, Option<&str>)> = previous.into_iter().collect();
        let stored: HashMap<&str, Option<&str>> = previous.iter().copied().collect();

        let mut diff = ManifestDiff::default();
        for entry in &self.entries {
            match stored.get(entry.url.as_str()) {
                None => diff.added.push(entry.clone()),
                Some(Some(rev)) if *rev == entry.revision => diff.unchanged.push(entry.clone()),
                Some(_) => diff.changed.push(entry.clone()),
            }
        }

        let current: HashSet<&str> = self.urls().collect();
        diff.removed = previous
            .iter()
            .filter(|(url, _)| !current.contains(url))
            .map(|(url, _)| (*url).to_string())
            .collect();

        diff
    }
}

impl TryFrom<Vec<CacheEntry>> for Manifest {
    type Error = Error;

    fn try_from(entries: Vec<CacheEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<Manifest> for Vec<CacheEntry> {
    fn from(manifest: Manifest) -> Self {
        manifest.entries
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a CacheEntry;
    type IntoIter = std::slice::Iter<'a, CacheEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Result of comparing a new manifest with stored entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    /// In the manifest, not stored.
    pub added: Vec<CacheEntry>,
    /// Stored under a different (or no) revision.
    pub changed: Vec<CacheEntry>,
    /// Stored under the same revision.
    pub unchanged: Vec<CacheEntry>,
    /// Stored, but absent from the manifest.
    pub removed: Vec<String>,
}

impl ManifestDiff {
    /// Entries that must be fetched to bring the store up to date.
    pub fn to_fetch(&self) -> impl Iterator<Item = &CacheEntry> {
        self.added.iter().chain(self.changed.iter())
    }

    pub fn is_up_to_date(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}
