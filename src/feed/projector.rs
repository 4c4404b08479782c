use std::sync::Arc;

use crate::feed::parser::{FeedDocument, RawItem};

/// Caller-supplied predicate deciding whether an item is projected. Evaluated
/// once per item, in document order, before the cap — so rejected items do not
/// count toward `max_items`.
pub type ItemFilter = Arc<dyn Fn(&RawItem) -> bool + Send + Sync>;

/// The default filter: every item passes.
pub fn accept_all() -> ItemFilter {
    Arc::new(|_| true)
}

/// Extraction strategy turning a raw item into output fields.
///
/// The provided methods pass the raw markup through unchanged; implementors
/// override individual fields (date re-rendering, link rewriting) without
/// touching the iteration logic.
pub trait ExtractItem: Send + Sync {
    fn title(&self, item: &RawItem) -> Option<String> {
        item.title.clone()
    }

    fn link(&self, item: &RawItem) -> Option<String> {
        item.link.clone()
    }

    fn published(&self, item: &RawItem) -> Option<String> {
        item.pub_date.clone()
    }
}

/// Identity extraction: raw fields straight through.
pub struct RawExtractor;

impl ExtractItem for RawExtractor {}

/// Re-renders `pubDate` from RFC 2822 to RFC 3339. A date that does not parse
/// passes through raw rather than being dropped.
pub struct Rfc2822DateExtractor;

impl ExtractItem for Rfc2822DateExtractor {
    fn published(&self, item: &RawItem) -> Option<String> {
        let raw = item.pub_date.as_deref()?;
        match chrono::DateTime::parse_from_rfc2822(raw) {
            Ok(dt) => Some(dt.to_rfc3339()),
            Err(_) => Some(raw.to_string()),
        }
    }
}

/// A projected feed item, produced fresh on every projection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
}

/// Builds the lazy projection of `doc`: filter, then cap at `max_items`
/// emissions (`0` = unlimited).
pub fn project(
    doc: Arc<FeedDocument>,
    filter: ItemFilter,
    extractor: Arc<dyn ExtractItem>,
    max_items: u64,
) -> Projection {
    Projection {
        doc: Some(doc),
        filter,
        extractor,
        max_items,
        pos: 0,
        emitted: 0,
    }
}

/// Lazy, finite, non-restartable sequence of [`FeedItem`]s.
///
/// Consumed by value; once exhausted it stays exhausted. The backing document
/// is shared with the cache, so iterating never copies the parsed feed.
pub struct Projection {
    doc: Option<Arc<FeedDocument>>,
    filter: ItemFilter,
    extractor: Arc<dyn ExtractItem>,
    max_items: u64,
    pos: usize,
    emitted: u64,
}

impl Projection {
    /// The projection of a feed that could not be fetched: yields nothing and
    /// reports no data.
    pub fn empty() -> Self {
        Self {
            doc: None,
            filter: accept_all(),
            extractor: Arc::new(RawExtractor),
            max_items: 0,
            pos: 0,
            emitted: 0,
        }
    }

    /// Whether a document was available and contained at least one item node.
    /// Independent of the filter: a projection whose filter rejects everything
    /// still has data, and the caller renders it as empty either way.
    pub fn has_data(&self) -> bool {
        self.doc.as_ref().is_some_and(|doc| !doc.items.is_empty())
    }
}

impl Iterator for Projection {
    type Item = FeedItem;

    fn next(&mut self) -> Option<FeedItem> {
        let doc = self.doc.clone()?;
        if self.max_items > 0 && self.emitted >= self.max_items {
            return None;
        }
        while self.pos < doc.items.len() {
            let raw = &doc.items[self.pos];
            self.pos += 1;
            if (self.filter)(raw) {
                self.emitted += 1;
                return Some(FeedItem {
                    title: self.extractor.title(raw),
                    link: self.extractor.link(raw),
                    published: self.extractor.published(raw),
                });
            }
        }
        None
    }
}
