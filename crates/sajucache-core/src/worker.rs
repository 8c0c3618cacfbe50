//! Cache worker lifecycle: install, activate, and read-through fetch.
//!
//! The worker owns one version-tagged bucket at a time. Install eagerly
//! populates it from the precache manifest (all-or-nothing), activate deletes
//! every other bucket, and `handle_fetch` serves requests cache-first with
//! live responses stored for future hits. Each handler call is an independent
//! async operation; bucket consistency is delegated to the storage layer.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::cache::{BucketStatus, CacheManager};
use crate::models::{FetchedResponse, PrecacheManifest, StoredResponse};
use crate::net::{fetch_with_fallback, FetchError, Fetcher};

/// Maximum concurrent precache downloads.
/// Bounded so install doesn't open a connection per asset on large builds.
const MAX_CONCURRENT_PRECACHE: usize = 8;

/// Outcome of handling one intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// URL scheme is outside http/https; the caller's native fetch takes
    /// over and the cache is never consulted.
    Bypass,
    /// Served from the active bucket with no network round-trip.
    Cached(StoredResponse),
    /// Served live from the network.
    Network(FetchedResponse),
}

#[derive(Debug)]
pub struct InstallReport {
    pub bucket: String,
    pub assets: usize,
}

#[derive(Debug)]
pub struct ActivateReport {
    pub active: String,
    pub removed: Vec<String>,
}

pub struct Worker {
    origin: Url,
    bucket_name: String,
    manager: CacheManager,
    fetcher: Arc<dyn Fetcher>,
}

impl Worker {
    pub fn new(
        origin: Url,
        bucket_name: String,
        manager: CacheManager,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            origin,
            bucket_name,
            manager,
            fetcher,
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Only http/https requests are cache-eligible; extension schemes and
    /// the like are left entirely to the caller.
    fn is_cacheable_scheme(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }

    /// Eagerly fetch and store every manifest asset into the version bucket.
    ///
    /// All-or-nothing: nothing is written until every asset came back with
    /// HTTP 200, and a bucket that fails mid-write is removed. A failed
    /// install leaves whatever bucket was previously active untouched.
    pub async fn install(&self, manifest: &PrecacheManifest) -> Result<InstallReport> {
        let urls = manifest.asset_urls(&self.origin)?;
        info!(bucket = %self.bucket_name, assets = urls.len(), "precaching");

        let results: Vec<Result<FetchedResponse, FetchError>> = stream::iter(urls)
            .map(|url| {
                let fetcher = Arc::clone(&self.fetcher);
                async move { fetcher.fetch(&url).await }
            })
            .buffer_unordered(MAX_CONCURRENT_PRECACHE)
            .collect()
            .await;

        let mut responses = Vec::with_capacity(results.len());
        for result in results {
            let response = result.context("Precache fetch failed")?;
            if response.status != 200 {
                bail!(
                    "Precache fetch for {} returned HTTP {}",
                    response.url,
                    response.status
                );
            }
            responses.push(response);
        }

        let bucket = self.manager.open_bucket(&self.bucket_name)?;
        for response in &responses {
            let kind = response.kind(&self.origin);
            if let Err(err) = bucket.put(&StoredResponse::from_fetched(response, kind)) {
                // A half-written bucket must not survive install
                let _ = self.manager.remove_bucket(&self.bucket_name);
                return Err(err).context("Failed to store precached asset");
            }
        }

        info!(bucket = %self.bucket_name, assets = responses.len(), "install complete");
        Ok(InstallReport {
            bucket: self.bucket_name.clone(),
            assets: responses.len(),
        })
    }

    /// Delete every bucket other than the current version's. No rollback.
    pub async fn activate(&self) -> Result<ActivateReport> {
        let removed = self
            .manager
            .purge_except(&self.bucket_name)
            .context("Failed to purge stale cache buckets")?;

        if removed.is_empty() {
            debug!(active = %self.bucket_name, "no stale buckets");
        } else {
            info!(active = %self.bucket_name, removed = removed.len(), "stale buckets deleted");
        }

        Ok(ActivateReport {
            active: self.bucket_name.clone(),
            removed,
        })
    }

    /// Serve one request cache-first.
    ///
    /// Cached entries are returned with no freshness check - the bucket is
    /// effectively infinite-TTL until the next activation. On a miss the
    /// response is fetched live (with one fallback retry on transport
    /// failure) and stored for future hits when it is HTTP 200 and basic.
    /// Store failures never affect the returned response.
    pub async fn handle_fetch(&self, url: &str) -> Result<FetchOutcome> {
        let url = Url::parse(url).with_context(|| format!("Unparseable request URL: {}", url))?;

        if !Self::is_cacheable_scheme(&url) {
            debug!(url = %url, scheme = url.scheme(), "scheme not cacheable, passing through");
            return Ok(FetchOutcome::Bypass);
        }

        let bucket = self.manager.open_bucket(&self.bucket_name)?;
        match bucket.get(url.as_str()) {
            Ok(Some(hit)) => {
                debug!(url = %url, "cache hit");
                return Ok(FetchOutcome::Cached(hit));
            }
            Ok(None) => {}
            Err(err) => {
                // A damaged entry must not fail the request; treat as a miss
                warn!(url = %url, error = %err, "cache read failed");
            }
        }

        debug!(url = %url, "cache miss");
        let response = fetch_with_fallback(self.fetcher.as_ref(), &url)
            .await
            .with_context(|| format!("Fetch failed for {}", url))?;

        let kind = response.kind(&self.origin);
        if response.status == 200 && kind.is_basic() {
            if let Err(err) = bucket.put(&StoredResponse::from_fetched(&response, kind)) {
                warn!(url = %url, error = %err, "failed to store response");
            }
        } else {
            debug!(url = %url, status = response.status, ?kind, "response not cacheable");
        }

        Ok(FetchOutcome::Network(response))
    }

    /// Status rows for every bucket under the cache root.
    pub fn status(&self) -> Result<Vec<BucketStatus>> {
        self.manager.statuses(&self.bucket_name)
    }
}
