//! Process-lifetime TTL caches for fetched feed documents and fetch failures.
//!
//! One [`FeedCache`] is constructed at startup and shared (via `Arc`) by every
//! worker that fetches feeds. It holds two independent tables keyed by the
//! normalized feed URL: parsed documents with a caller-chosen TTL, and
//! [`FailureRecord`]s that drive retry suppression and report escalation.
//! Entries expire lazily on access; there is no background sweep.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::feed::FeedDocument;

/// Derives the cache key for a feed URL by stripping every character that is
/// not ASCII alphanumeric.
///
/// Two URLs that differ only in punctuation share a key
/// (`http://a.example/feed` and `http://ae.xamplefeed` collide). Known
/// collision risk, kept as-is.
pub fn cache_key(url: &str) -> String {
    url.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[derive(Clone)]
struct StoredDocument {
    doc: Arc<FeedDocument>,
    expires_at: Instant,
}

/// Outcome of the most recent failed fetch for one feed, with the two
/// suppression deadlines attached.
///
/// `retry_until` gates the network (no fetch is attempted while it is in the
/// future); `escalate_until` gates operator notification (a failure inside the
/// window is a recurrence and gets reported, a failure after it starts a fresh
/// silent window). The record counts as absent once both have passed.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub message: String,
    pub retry_until: Instant,
    pub escalate_until: Instant,
}

impl FailureRecord {
    pub fn retry_suppressed(&self, now: Instant) -> bool {
        now < self.retry_until
    }

    pub fn escalation_active(&self, now: Instant) -> bool {
        now < self.escalate_until
    }

    fn lapsed(&self, now: Instant) -> bool {
        !self.retry_suppressed(now) && !self.escalation_active(now)
    }
}

/// Shared in-memory cache. See the module docs for the two-table layout.
///
/// Reads vastly outnumber writes, so both tables are sharded maps rather than
/// a single mutex. There are no cross-key invariants.
#[derive(Default)]
pub struct FeedCache {
    documents: DashMap<String, StoredDocument>,
    failures: DashMap<String, FailureRecord>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached document for `key`, or `None` if nothing was stored
    /// or the entry has expired. Expired entries are removed on the way out.
    pub fn get_document(&self, key: &str) -> Option<Arc<FeedDocument>> {
        let now = Instant::now();
        match self.documents.get(key) {
            None => return None,
            Some(entry) if now < entry.expires_at => return Some(Arc::clone(&entry.doc)),
            Some(_) => {}
        }
        // Expired. The predicate re-checks under the write lock so a fresh
        // entry stored by a concurrent fetch is not dropped.
        self.documents.remove_if(key, |_, entry| now >= entry.expires_at);
        tracing::debug!(key = %key, "dropped expired document entry");
        None
    }

    /// Stores a document for `key`, replacing any existing entry.
    ///
    /// A zero `ttl` means caching is disabled for this call: any existing
    /// entry is removed and nothing is stored.
    pub fn put_document(&self, key: &str, doc: Arc<FeedDocument>, ttl: Duration) {
        if ttl.is_zero() {
            self.documents.remove(key);
            tracing::debug!(key = %key, "zero ttl, document not cached");
            return;
        }
        let expires_at = Instant::now() + ttl;
        self.documents.insert(key.to_string(), StoredDocument { doc, expires_at });
    }

    /// Returns the failure record for `key` if either of its windows is still
    /// open. A fully-lapsed record is removed and reads as absent.
    pub fn get_failure(&self, key: &str) -> Option<FailureRecord> {
        let now = Instant::now();
        match self.failures.get(key) {
            None => return None,
            Some(entry) if !entry.lapsed(now) => return Some(entry.clone()),
            Some(_) => {}
        }
        self.failures.remove_if(key, |_, entry| entry.lapsed(now));
        None
    }

    /// Stores a failure record for `key`, replacing any existing one. The
    /// caller decides how the new deadlines relate to the old record's.
    pub fn put_failure(&self, key: &str, record: FailureRecord) {
        self.failures.insert(key.to_string(), record);
    }

    #[cfg(test)]
    fn document_entry_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::RawItem;
    use proptest::prelude::*;

    fn doc_with_items(n: usize) -> Arc<FeedDocument> {
        let items = (0..n)
            .map(|i| RawItem {
                title: Some(format!("Item {i}")),
                link: None,
                pub_date: None,
            })
            .collect();
        Arc::new(FeedDocument { items })
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_cache_key_strips_punctuation() {
        assert_eq!(cache_key("http://example.test/feed.xml"), "httpexampletestfeedxml");
        assert_eq!(cache_key(""), "");
        assert_eq!(cache_key("!!!"), "");
    }

    #[test]
    fn test_cache_key_collision_is_deliberate() {
        // Punctuation-only differences collapse to the same key.
        assert_eq!(
            cache_key("http://example.test/feed.xml"),
            cache_key("http://example.test/feed?xml")
        );
    }

    proptest! {
        #[test]
        fn prop_cache_key_is_alphanumeric(url in ".*") {
            let key = cache_key(&url);
            prop_assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        }

        #[test]
        fn prop_cache_key_is_idempotent(url in ".*") {
            let key = cache_key(&url);
            prop_assert_eq!(cache_key(&key), key.clone());
        }
    }

    #[tokio::test]
    async fn test_document_roundtrip() {
        let cache = FeedCache::new();
        cache.put_document("k", doc_with_items(2), 60 * MINUTE);

        let doc = cache.get_document("k").expect("entry should be present");
        assert_eq!(doc.items.len(), 2);
        assert!(cache.get_document("other").is_none());
    }

    #[tokio::test]
    async fn test_put_document_overwrites() {
        let cache = FeedCache::new();
        cache.put_document("k", doc_with_items(1), 60 * MINUTE);
        cache.put_document("k", doc_with_items(5), 60 * MINUTE);

        let doc = cache.get_document("k").unwrap();
        assert_eq!(doc.items.len(), 5);
        assert_eq!(cache.document_entry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_expiry_boundary() {
        let cache = FeedCache::new();
        cache.put_document("k", doc_with_items(1), MINUTE);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get_document("k").is_some(), "59s < 1min ttl");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get_document("k").is_none(), "61s > 1min ttl");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_removed_on_read() {
        let cache = FeedCache::new();
        cache.put_document("k", doc_with_items(1), MINUTE);
        assert_eq!(cache.document_entry_count(), 1);

        tokio::time::advance(2 * MINUTE).await;
        assert!(cache.get_document("k").is_none());
        assert_eq!(cache.document_entry_count(), 0, "lazy expiry frees the slot");
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_caching() {
        let cache = FeedCache::new();
        cache.put_document("k", doc_with_items(1), Duration::ZERO);
        assert!(cache.get_document("k").is_none());

        // A zero-ttl put also clears a previously cached document.
        cache.put_document("k", doc_with_items(1), 60 * MINUTE);
        assert!(cache.get_document("k").is_some());
        cache.put_document("k", doc_with_items(1), Duration::ZERO);
        assert!(cache.get_document("k").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_record_windows() {
        let cache = FeedCache::new();
        let now = Instant::now();
        cache.put_failure(
            "k",
            FailureRecord {
                message: "connect refused".into(),
                retry_until: now + 10 * MINUTE,
                escalate_until: now + 20 * MINUTE,
            },
        );

        let record = cache.get_failure("k").unwrap();
        assert!(record.retry_suppressed(Instant::now()));
        assert!(record.escalation_active(Instant::now()));

        // Past the retry window but inside the escalation window.
        tokio::time::advance(11 * MINUTE).await;
        let record = cache.get_failure("k").unwrap();
        assert!(!record.retry_suppressed(Instant::now()));
        assert!(record.escalation_active(Instant::now()));

        // Both windows lapsed: the record reads as absent.
        tokio::time::advance(10 * MINUTE).await;
        assert!(cache.get_failure("k").is_none());
    }

    #[tokio::test]
    async fn test_failure_and_document_tables_are_independent() {
        let cache = FeedCache::new();
        let now = Instant::now();
        cache.put_document("k", doc_with_items(1), 60 * MINUTE);
        cache.put_failure(
            "k",
            FailureRecord {
                message: "timed out".into(),
                retry_until: now + 10 * MINUTE,
                escalate_until: now + 20 * MINUTE,
            },
        );

        assert!(cache.get_document("k").is_some());
        assert!(cache.get_failure("k").is_some());
    }
}
