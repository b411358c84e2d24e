//! Responses handed back to the requester.

use bytes::Bytes;
use precache_core::StoredEntry;
use serde::Serialize;

use crate::fetch::FetchResponse;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Precache,
}

/// A response served by the precache or a routing strategy.
#[derive(Debug, Clone, Serialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: Bytes,
    pub source: ResponseSource,
}

impl CachedResponse {
    pub fn from_network(response: &FetchResponse) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            body: response.bytes.clone(),
            source: ResponseSource::Network,
        }
    }

    pub fn from_entry(entry: StoredEntry, source: ResponseSource) -> Self {
        Self {
            url: entry.url,
            status: entry.status_code,
            content_type: entry.content_type,
            body: Bytes::from(entry.body),
            source,
        }
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
