//! Query fingerprint caching (spec.md §4.I log fields; additive
//! performance behavior only, never a correctness dependency). Hashing a
//! multi-kilobyte query string on every request is wasted work when the
//! same operation is replayed thousands of times a minute, so the
//! fingerprint is memoized behind a small LRU.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use lru::LruCache;

/// A stable, non-reversible identifier for a query's shape, used in log
/// lines instead of the full query text.
fn compute(query: &str) -> String {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

pub trait QueryFingerprintCache: Send + Sync {
    fn fingerprint(&self, query: &str) -> String;
}

/// Caches up to `capacity` fingerprints for the life of the process.
pub struct LruQueryFingerprintCache {
    cache: Mutex<LruCache<String, String>>,
}

impl LruQueryFingerprintCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity).unwrap_or(std::num::NonZeroUsize::MIN);
        LruQueryFingerprintCache {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl QueryFingerprintCache for LruQueryFingerprintCache {
    fn fingerprint(&self, query: &str) -> String {
        let mut cache = self.cache.lock().expect("fingerprint cache mutex is never poisoned by a panicking holder");
        if let Some(hit) = cache.get(query) {
            return hit.clone();
        }
        let fingerprint = compute(query);
        cache.put(query.to_string(), fingerprint.clone());
        fingerprint
    }
}

/// Always recomputes; used in tests where cache hits would make assertions
/// depend on call order.
#[derive(Default)]
pub struct NoopQueryFingerprintCache;

impl QueryFingerprintCache for NoopQueryFingerprintCache {
    fn fingerprint(&self, query: &str) -> String {
        compute(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_query_text_produces_the_same_fingerprint() {
        let cache = LruQueryFingerprintCache::new(8);
        assert_eq!(cache.fingerprint("{ widgets { id } }"), cache.fingerprint("{ widgets { id } }"));
    }

    #[test]
    fn different_query_text_produces_different_fingerprints() {
        let cache = NoopQueryFingerprintCache;
        assert_ne!(cache.fingerprint("{ a }"), cache.fingerprint("{ b }"));
    }

    #[test]
    fn eviction_does_not_change_the_recomputed_value() {
        let cache = LruQueryFingerprintCache::new(1);
        let first = cache.fingerprint("{ a }");
        cache.fingerprint("{ b }");
        assert_eq!(cache.fingerprint("{ a }"), first);
    }
}
