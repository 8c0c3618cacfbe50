//! HTTP fetch backend.
//!
//! `HttpClient` performs plain GET requests (the only verb the asset layer
//! uses) and reports the final post-redirect URL so the caller can classify
//! the response against the app origin.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use super::FetchError;
use crate::models::FetchedResponse;

/// HTTP request timeout in seconds.
/// 30s rides out slow mobile networks while still failing in bounded time.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A network backend the worker fetches through.
///
/// Implementations must be safe to call concurrently; each fetch is an
/// independent operation with no shared request state.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError>;
}

/// reqwest-backed fetcher.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let allows_cross_origin = response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN);

        let body = response.bytes().await?.to_vec();
        debug!(url = %url, status, bytes = body.len(), "fetched");

        Ok(FetchedResponse {
            url: url.clone(),
            final_url,
            status,
            content_type,
            allows_cross_origin,
            body,
        })
    }
}

/// Fetch with one fallback attempt on transport failure.
///
/// HTTP error statuses are delivered responses and never retried; only a
/// failed transport gets the second attempt, whose outcome propagates as-is.
pub async fn fetch_with_fallback(
    fetcher: &dyn Fetcher,
    url: &Url,
) -> Result<FetchedResponse, FetchError> {
    match fetcher.fetch(url).await {
        Ok(response) => Ok(response),
        Err(err) => {
            warn!(url = %url, error = %err, "fetch failed, retrying once");
            fetcher.fetch(url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Fails the first `failures` calls, then serves an empty 200.
    struct FlakyNet {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyNet {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for FlakyNet {
        async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(FetchError::Transport("connection reset".to_string()));
            }
            Ok(FetchedResponse {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                content_type: None,
                allows_cross_origin: false,
                body: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_fallback_recovers_from_single_failure() {
        let net = FlakyNet::new(1);
        let url = Url::parse("https://saju.example/app.js").unwrap();

        let response = fetch_with_fallback(&net, &url).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(net.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_gives_up_after_second_failure() {
        let net = FlakyNet::new(2);
        let url = Url::parse("https://saju.example/app.js").unwrap();

        let result = fetch_with_fallback(&net, &url).await;
        assert!(result.is_err());
        // Exactly two attempts, no further retries
        assert_eq!(net.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_when_first_attempt_succeeds() {
        let net = FlakyNet::new(0);
        let url = Url::parse("https://saju.example/app.js").unwrap();

        fetch_with_fallback(&net, &url).await.unwrap();
        assert_eq!(net.calls.load(Ordering::SeqCst), 1);
    }
}
