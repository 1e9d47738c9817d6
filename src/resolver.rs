// 🧭 Resolver cache - memoizing natural key → vertex id lookup
// Bounded LRU: eviction trades a re-query for bounded memory, never
// correctness, since the same key always resolves to the same vertex

use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;

use crate::errors::FeedError;
use crate::store::{GraphStore, VertexId};

/// Default maximum number of cached key → id entries.
pub const DEFAULT_CACHE_SIZE: usize = 1_000_000;

/// Hit/miss counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} size={}/{}",
            self.hits, self.misses, self.len, self.capacity
        )
    }
}

/// Memoizing resolver from natural key to graph-internal vertex id.
///
/// First call for a key issues a point lookup against the store and expects
/// at least one match (the first match wins when upstream data carries
/// duplicates); later calls return the cached id without a store round-trip.
pub struct ResolverCache {
    type_tag: String,
    cache: LruCache<String, VertexId>,
    hits: u64,
    misses: u64,
}

impl ResolverCache {
    pub fn new(type_tag: &str, capacity: usize) -> Self {
        ResolverCache {
            type_tag: type_tag.to_string(),
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Resolve a natural key to a vertex id, querying the store at most
    /// once per cache residency.
    pub fn resolve<S: GraphStore + ?Sized>(
        &mut self,
        store: &mut S,
        key: &str,
    ) -> Result<VertexId, FeedError> {
        if let Some(id) = self.cache.get(key) {
            self.hits += 1;
            return Ok(id.clone());
        }

        self.misses += 1;
        let matches = store.lookup_by_key(&self.type_tag, key)?;
        let id = matches
            .into_iter()
            .next()
            .ok_or_else(|| FeedError::UnresolvedKey {
                key: key.to_string(),
            })?;

        self.cache.put(key.to_string(), id.clone());
        Ok(id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.cache.len(),
            capacity: self.cache.cap().get(),
        }
    }
}
