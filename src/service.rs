//! The inbound surface for the rendering layer.
//!
//! [`FeedService::request_items`] is the one call a consumer makes per page
//! view. Configuration mistakes (no URL, junk URL) come back as typed errors;
//! fetch and parse failures never do — they degrade to an empty projection
//! with `has_data() == false`, and operator visibility happens through the
//! reporter instead.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::cache::FeedCache;
use crate::feed::{
    accept_all, project, ExtractItem, Fetcher, ItemFilter, Projection, RawExtractor,
};
use crate::report::Reporter;

/// Precondition violations a caller can detect before any fetch happens.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No feed URL was supplied.
    #[error("no feed URL configured")]
    MissingUrl,
    /// The URL string could not be parsed.
    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// One projection request. Defaults: unlimited items, 60-minute refresh
/// interval, accept-all filter, raw extraction.
pub struct ItemRequest {
    url: String,
    max_items: u64,
    refresh_minutes: u64,
    filter: ItemFilter,
    extractor: Arc<dyn ExtractItem>,
}

impl ItemRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_items: 0,
            refresh_minutes: 60,
            filter: accept_all(),
            extractor: Arc::new(RawExtractor),
        }
    }

    /// Caps the number of emitted items; `0` means unlimited.
    pub fn max_items(mut self, max_items: u64) -> Self {
        self.max_items = max_items;
        self
    }

    /// Document cache TTL in minutes; `0` disables caching (every call
    /// refetches).
    pub fn refresh_minutes(mut self, minutes: u64) -> Self {
        self.refresh_minutes = minutes;
        self
    }

    pub fn filter(mut self, filter: ItemFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ExtractItem>) -> Self {
        self.extractor = extractor;
        self
    }
}

/// Ties the fetcher and projector together behind one call.
pub struct FeedService {
    fetcher: Fetcher,
}

impl FeedService {
    pub fn new(cache: Arc<FeedCache>, reporter: Arc<dyn Reporter>) -> Self {
        Self { fetcher: Fetcher::new(cache, reporter) }
    }

    /// Allows a preconfigured fetcher (custom HTTP client).
    pub fn with_fetcher(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Fetches (or reuses) the feed document and returns its lazy projection.
    /// Check [`Projection::has_data`] to distinguish "feed unavailable or
    /// empty" from a populated result.
    pub async fn request_items(&self, request: ItemRequest) -> Result<Projection, RequestError> {
        let url = validate_feed_url(&request.url)?;
        let ttl = Duration::from_secs(request.refresh_minutes * 60);

        match self.fetcher.fetch(url.as_str(), ttl).await {
            Some(doc) => Ok(project(doc, request.filter, request.extractor, request.max_items)),
            None => Ok(Projection::empty()),
        }
    }
}

fn validate_feed_url(raw: &str) -> Result<Url, RequestError> {
    if raw.trim().is_empty() {
        return Err(RequestError::MissingUrl);
    }
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(RequestError::UnsupportedScheme(scheme.to_owned())),
    }
}
