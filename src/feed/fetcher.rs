use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::{cache_key, FailureRecord, FeedCache};
use crate::feed::parser::{parse_feed, FeedDocument, ParseError};
use crate::report::{FailureContext, Reporter};

/// Hard per-request deadline. The GET (including the body read) is cancelled
/// when it fires; nothing is left hanging past it.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// After any failure, the network is not retried for this long.
pub const RETRY_SUPPRESS: Duration = Duration::from_secs(10 * 60);

/// A failure recurring within this window of the first one is reported;
/// isolated failures stay silent.
pub const ESCALATION_WINDOW: Duration = Duration::from_secs(20 * 60);

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const BODY_SNIPPET_LIMIT: usize = 2048;

/// What went wrong while producing a document. Never escapes [`Fetcher::fetch`]:
/// every variant is absorbed by the failure policy and the caller sees `None`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the 5-second deadline
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("response too large")]
    ResponseTooLarge,
    /// Response body was not valid UTF-8
    #[error("response body is not valid UTF-8")]
    InvalidUtf8,
    /// Body was read but did not parse as a feed document
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Produces parsed feed documents, cache-first, with failure suppression.
///
/// All state lives in the shared [`FeedCache`]; the fetcher itself is cheap
/// and can be cloned per worker.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    cache: Arc<FeedCache>,
    reporter: Arc<dyn Reporter>,
}

impl Fetcher {
    pub fn new(cache: Arc<FeedCache>, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_client(reqwest::Client::new(), cache, reporter)
    }

    /// Allows custom client configuration (proxies, user agent).
    pub fn with_client(
        client: reqwest::Client,
        cache: Arc<FeedCache>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self { client, cache, reporter }
    }

    /// Returns the document for `url`, from cache or the network. `None` means
    /// "nothing to display": a suppressed retry, a non-200 answer, or a fresh
    /// failure that the policy has absorbed.
    ///
    /// `refresh_interval` is the cache TTL for a successfully fetched
    /// document; zero disables caching for this call.
    pub async fn fetch(&self, url: &str, refresh_interval: Duration) -> Option<Arc<FeedDocument>> {
        let key = cache_key(url);
        let now = Instant::now();

        // Failure gate first: a recently broken feed gets no network traffic
        // at all, cached document or not.
        if let Some(failure) = self.cache.get_failure(&key) {
            if failure.retry_suppressed(now) {
                tracing::debug!(feed = %url, error = %failure.message, "retry suppressed, skipping fetch");
                return None;
            }
        }

        if let Some(doc) = self.cache.get_document(&key) {
            tracing::debug!(feed = %url, "document cache hit");
            return Some(doc);
        }

        let body = match self.fetch_remote(url).await {
            Ok(Some(body)) => body,
            // The remote answered with a non-200; no document, not a failure.
            Ok(None) => return None,
            Err(err) => {
                self.note_failure(url, &key, &err.to_string(), None);
                return None;
            }
        };

        match parse_feed(&body) {
            Ok(doc) => {
                let doc = Arc::new(doc);
                self.cache.put_document(&key, Arc::clone(&doc), refresh_interval);
                tracing::info!(feed = %url, items = doc.items.len(), "stored feed document");
                Some(doc)
            }
            Err(err) => {
                let message = FetchError::from(err).to_string();
                self.note_failure(url, &key, &message, Some(body));
                None
            }
        }
    }

    /// One GET under the hard deadline. `Ok(None)` is the silent non-200 path.
    async fn fetch_remote(&self, url: &str) -> Result<Option<String>, FetchError> {
        tokio::time::timeout(FETCH_TIMEOUT, self.fetch_remote_inner(url))
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    async fn fetch_remote_inner(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self.client.get(url).send().await?;

        // Only 200 counts as success; anything else means no document.
        if response.status() != reqwest::StatusCode::OK {
            tracing::debug!(feed = %url, status = %response.status(), "non-200 response, no document");
            return Ok(None);
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        let body = String::from_utf8(bytes).map_err(|_| FetchError::InvalidUtf8)?;
        Ok(Some(body))
    }

    /// The two-strike failure policy.
    ///
    /// No active escalation window: open one and stay silent. Active window:
    /// this is a recurrence, report it and keep the window's original deadline.
    /// Either way the retry suppression is refreshed, so combined with the
    /// gate in [`fetch`](Self::fetch) a feed produces at most one report per
    /// escalation window.
    fn note_failure(&self, url: &str, key: &str, message: &str, body: Option<String>) {
        let now = Instant::now();
        let active = self.cache.get_failure(key).filter(|r| r.escalation_active(now));

        match active {
            None => {
                tracing::debug!(feed = %url, error = %message, "fetch failed, first strike stays silent");
                self.cache.put_failure(
                    key,
                    FailureRecord {
                        message: message.to_string(),
                        retry_until: now + RETRY_SUPPRESS,
                        escalate_until: now + ESCALATION_WINDOW,
                    },
                );
            }
            Some(previous) => {
                let context = FailureContext {
                    feed_url: url.to_string(),
                    response_body: body.map(snippet),
                    next_notification: Utc::now()
                        + chrono::Duration::seconds(RETRY_SUPPRESS.as_secs() as i64),
                };
                self.reporter.report(message, &context);
                self.cache.put_failure(
                    key,
                    FailureRecord {
                        message: message.to_string(),
                        retry_until: now + RETRY_SUPPRESS,
                        // A recurrence does not extend the window.
                        escalate_until: previous.escalate_until,
                    },
                );
            }
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: trust Content-Length when it already exceeds the limit.
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Caps a captured body for inclusion in a report, on a char boundary.
fn snippet(body: String) -> String {
    if body.len() <= BODY_SNIPPET_LIMIT {
        return body;
    }
    let mut end = BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
