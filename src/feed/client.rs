use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::coordinator::Generation;
use crate::feed::types::{FeedPayload, RawItem};

/// Bound on a single feed fetch. A hung feed otherwise delays the whole
/// aggregation, since the join waits for every fetch to settle.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker for a fetch or aggregation abandoned because its generation was
/// superseded. Deliberately distinct from the soft-failure taxonomy: callers
/// must never substitute an empty item list for a cancellation, or an
/// abandoned aggregation would masquerade as a settled one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request superseded by a newer one")]
pub struct Cancelled;

/// Everything that can go wrong fetching one feed through the conversion
/// backend. All of these reduce to a soft failure at the aggregation
/// boundary; the taxonomy exists for logging and for tests.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response from the conversion backend
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded [`FETCH_TIMEOUT`]
    #[error("request timed out")]
    Timeout,
    /// Response body was not the expected JSON payload
    #[error("malformed payload: {0}")]
    Payload(String),
    /// Backend answered but reported it could not convert the feed
    #[error("backend reported failure: {0}")]
    Backend(String),
}

/// Outcome of fetching one feed endpoint.
///
/// `failed` marks a soft failure: the fetch errored and was absorbed as an
/// empty item list so the aggregation can proceed without this feed.
#[derive(Debug)]
pub struct FeedFetch {
    pub endpoint: String,
    pub feed_title: Option<String>,
    pub items: Vec<RawItem>,
    pub failed: bool,
}

impl FeedFetch {
    fn soft_failure(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            feed_title: None,
            items: Vec::new(),
            failed: true,
        }
    }
}

/// Client for the feed-conversion backend.
///
/// One HTTP GET per feed URL, with the feed URL and the optional access
/// credential passed as query parameters. No retries: a feed that fails this
/// round simply contributes nothing until the next aggregation.
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    convert_endpoint: Url,
    api_key: Option<SecretString>,
}

impl FeedClient {
    pub fn new(convert_endpoint: Url, api_key: Option<SecretString>) -> Self {
        Self {
            http: reqwest::Client::new(),
            convert_endpoint,
            api_key,
        }
    }

    /// Fetch one feed, racing the request against supersession.
    ///
    /// Only [`Cancelled`] escapes as an error. Every other failure is logged
    /// and absorbed into a [`FeedFetch`] with `failed` set and no items, so a
    /// single bad feed cannot abort the aggregation it belongs to.
    pub async fn fetch(
        &self,
        endpoint: &str,
        generation: &Generation,
    ) -> Result<FeedFetch, Cancelled> {
        tokio::select! {
            _ = generation.cancelled() => Err(Cancelled),
            result = self.try_fetch(endpoint) => Ok(match result {
                Ok(fetch) => fetch,
                Err(error) => {
                    tracing::warn!(feed = %endpoint, error = %error, "Feed fetch failed, continuing without it");
                    FeedFetch::soft_failure(endpoint)
                }
            }),
        }
    }

    /// The raw fetch, with the full error taxonomy.
    pub async fn try_fetch(&self, endpoint: &str) -> Result<FeedFetch, FetchError> {
        let mut request = self
            .http
            .get(self.convert_endpoint.clone())
            .query(&[("rss_url", endpoint)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.expose_secret())]);
        }

        let response = tokio::time::timeout(FETCH_TIMEOUT, request.send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let payload: FeedPayload = response
            .json()
            .await
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        if payload.status != "ok" {
            return Err(FetchError::Backend(payload.status));
        }

        Ok(FeedFetch {
            endpoint: endpoint.to_string(),
            feed_title: payload
                .feed
                .map(|meta| meta.title)
                .filter(|title| !title.trim().is_empty()),
            items: payload.items,
            failed: false,
        })
    }
}

/// The credential never appears in logs or debug output.
impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("convert_endpoint", &self.convert_endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
