//! Cached syndication feed fetching with failure-throttled error reporting.
//!
//! `sift` fetches a remote RSS-shaped feed over HTTP, caches the parsed
//! document for a configurable interval, and exposes a filtered, ordered,
//! lazy sequence of item records to a rendering layer it knows nothing about.
//!
//! # Architecture
//!
//! Three components, composed as a pipeline:
//!
//! - [`cache::FeedCache`] — two independent TTL tables (documents, failures)
//!   keyed by the normalized feed URL, shared process-wide.
//! - [`feed::Fetcher`] — cache-first document acquisition with a hard 5-second
//!   timeout and a two-strike failure policy: an isolated failure is
//!   suppressed, a recurrence within 20 minutes is reported to the operator
//!   channel, and a failing feed gets no network traffic for 10 minutes.
//! - [`feed::Projection`] — the lazy filter-and-cap transformation from the
//!   parsed document to [`feed::FeedItem`] records, with pluggable per-field
//!   extraction.
//!
//! [`service::FeedService`] ties them together behind a single
//! `request_items` call; [`report::Reporter`] is the outbound operator
//! channel. The cache is always constructed explicitly and passed in — there
//! are no globals.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sift::cache::FeedCache;
//! use sift::report::LogReporter;
//! use sift::service::{FeedService, ItemRequest};
//!
//! # async fn demo() -> Result<(), sift::service::RequestError> {
//! let service = FeedService::new(Arc::new(FeedCache::new()), Arc::new(LogReporter));
//! let projection = service
//!     .request_items(ItemRequest::new("http://example.test/feed.xml").max_items(5))
//!     .await?;
//! for item in projection {
//!     println!("{}", item.title.as_deref().unwrap_or("(untitled)"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod feed;
pub mod report;
pub mod service;

pub use cache::{cache_key, FeedCache};
pub use feed::{FeedDocument, FeedItem, Fetcher, Projection, RawItem};
pub use report::{FailureContext, LogReporter, Reporter};
pub use service::{FeedService, ItemRequest, RequestError};
