//! The feed pipeline: parse, fetch (cache-first, failure-suppressed), project.
//!
//! Control flow per request: the service asks [`Fetcher`] for a document, the
//! fetcher consults the shared [`crate::cache::FeedCache`] and only then the
//! network, and the document (if any) is projected into [`FeedItem`]s through
//! the caller's filter and extraction strategy.

mod fetcher;
mod parser;
mod projector;

pub use fetcher::{FetchError, Fetcher, ESCALATION_WINDOW, FETCH_TIMEOUT, RETRY_SUPPRESS};
pub use parser::{parse_feed, FeedDocument, ParseError, RawItem};
pub use projector::{
    accept_all, project, ExtractItem, FeedItem, ItemFilter, Projection, RawExtractor,
    Rfc2822DateExtractor,
};
