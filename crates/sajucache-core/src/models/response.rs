//! Response types in flight and at rest.
//!
//! A `FetchedResponse` is what the network layer hands back; a
//! `StoredResponse` is a bucket entry (JSON metadata plus body bytes on
//! disk). The `ResponseKind` classification decides whether a live response
//! may be stored: only basic (same-origin, non-opaque) responses ever are.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Classification of a response relative to the configured app origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Final URL shares the app origin.
    Basic,
    /// Cross-origin, readable (carries `Access-Control-Allow-Origin`).
    Cors,
    /// Cross-origin, not readable.
    Opaque,
}

impl ResponseKind {
    pub fn is_basic(&self) -> bool {
        matches!(self, ResponseKind::Basic)
    }
}

/// A response as delivered by the network layer.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The URL that was requested. Bucket entries are keyed by this.
    pub url: Url,
    /// The URL the response actually came from, after redirects.
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    /// Whether the response carried `Access-Control-Allow-Origin`.
    pub allows_cross_origin: bool,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    /// Classify against the app origin. A redirect that lands cross-origin
    /// makes the response non-basic even if the request was same-origin.
    pub fn kind(&self, app_origin: &Url) -> ResponseKind {
        if self.final_url.origin() == app_origin.origin() {
            ResponseKind::Basic
        } else if self.allows_cross_origin {
            ResponseKind::Cors
        } else {
            ResponseKind::Opaque
        }
    }
}

/// Metadata half of a bucket entry; serialized as JSON beside the body file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub kind: ResponseKind,
    pub stored_at: DateTime<Utc>,
}

/// A response at rest in a cache bucket.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub meta: EntryMeta,
    pub body: Vec<u8>,
}

impl StoredResponse {
    /// Capture a live response for storage, stamping the store time.
    pub fn from_fetched(response: &FetchedResponse, kind: ResponseKind) -> Self {
        Self {
            meta: EntryMeta {
                url: response.url.to_string(),
                status: response.status,
                content_type: response.content_type.clone(),
                kind,
                stored_at: Utc::now(),
            },
            body: response.body.clone(),
        }
    }
}
