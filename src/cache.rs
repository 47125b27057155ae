//! In-memory TTL cache for merged, unfiltered aggregation results.
//!
//! Keyed by (category, source-set, language pair); search/page state is a
//! post-cache view and never part of the key. Entries go stale 5 minutes
//! after the write and are overwritten in place by the next aggregation for
//! the same key. There is no eviction beyond TTL staleness; the cache lives
//! exactly as long as the session, so abandoned keys are an accepted cost.
//!
//! Timestamps use the tokio clock so tests can pause and advance time.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::feed::Article;

/// How long a cached aggregation stays servable.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Composite cache key: category + sorted/joined source-set + language pair.
///
/// The source-set is sorted before joining so `["a", "b"]` and `["b", "a"]`
/// share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(category: &str, sources: &[String], language: &str, content_language: &str) -> Self {
        let mut sorted: Vec<&str> = sources.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        Self(format!(
            "{}|{}|{}|{}",
            category,
            sorted.join(","),
            language,
            content_language
        ))
    }
}

struct CacheEntry {
    data: Vec<Article>,
    stored_at: Instant,
}

pub struct FeedCache {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    /// Cache with a custom TTL. Used by tests; production uses [`CACHE_TTL`].
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Serve the entry for `key` if it is strictly within the TTL window.
    /// A stale entry is a miss; it stays in place until overwritten by the
    /// refresh that the miss triggers.
    pub fn get(&self, key: &CacheKey) -> Option<&[Article]> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(&entry.data)
        } else {
            None
        }
    }

    /// Store `data` under `key`, unconditionally replacing any previous entry
    /// and restarting its TTL window.
    pub fn put(&mut self, key: CacheKey, data: Vec<Article>) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for `key`, forcing the next read to re-aggregate.
    pub fn invalidate(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }
}

impl Default for FeedCache {
    fn default() -> Self {
        Self::new()
    }
}
