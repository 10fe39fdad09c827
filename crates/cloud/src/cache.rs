//! LRU cache of resolved HUC6 → HUC10 sets.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use streamviz_core::HucCode;

use crate::resolver::Huc10Set;

/// Default number of HUC6 basins kept.
pub const DEFAULT_CAPACITY: usize = 64;

/// LRU cache keyed by normalized HUC6 code.
pub struct HucCache {
    inner: LruCache<HucCode, Arc<Huc10Set>>,
}

impl HucCache {
    /// Create a new cache holding at most `capacity` basins (at least 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(cap),
        }
    }

    /// Cached set for `huc6`, refreshing its recency.
    pub fn get(&mut self, huc6: &HucCode) -> Option<Arc<Huc10Set>> {
        self.inner.get(huc6).cloned()
    }

    /// Store a resolved set, evicting the least recently used basin when full.
    pub fn insert(&mut self, huc6: HucCode, set: Arc<Huc10Set>) {
        self.inner.put(huc6, set);
    }

    /// Drop one entry. Returns whether it was present.
    pub fn remove(&mut self, huc6: &HucCode) -> bool {
        self.inner.pop(huc6).is_some()
    }

    /// Whether `huc6` is cached, without touching its recency.
    pub fn contains(&self, huc6: &HucCode) -> bool {
        self.inner.contains(huc6)
    }

    /// Number of cached basins.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Default for HucCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveStrategy;
    use streamviz_core::HucLevel;

    fn huc6(s: &str) -> HucCode {
        HucCode::parse(s, HucLevel::Huc6).unwrap()
    }

    fn empty_set(code: &str) -> Arc<Huc10Set> {
        Arc::new(Huc10Set {
            huc6: huc6(code),
            units: Vec::new(),
            strategy: ResolveStrategy::SpatialIntersect,
        })
    }

    #[test]
    fn test_cache_insert_get() {
        let mut cache = HucCache::new(2);
        cache.insert(huc6("020700"), empty_set("020700"));
        let hit = cache.get(&huc6("020700")).unwrap();
        assert_eq!(hit.huc6.as_str(), "020700");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_eviction() {
        let mut cache = HucCache::new(2);
        cache.insert(huc6("010100"), empty_set("010100"));
        cache.insert(huc6("010200"), empty_set("010200"));
        // touch the first so the second is least recent
        assert!(cache.get(&huc6("010100")).is_some());
        cache.insert(huc6("010300"), empty_set("010300"));

        assert!(cache.contains(&huc6("010100")));
        assert!(!cache.contains(&huc6("010200")));
        assert!(cache.contains(&huc6("010300")));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = HucCache::new(0);
        cache.insert(huc6("010100"), empty_set("010100"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = HucCache::default();
        cache.insert(huc6("010100"), empty_set("010100"));
        cache.insert(huc6("010200"), empty_set("010200"));
        assert!(cache.remove(&huc6("010100")));
        assert!(!cache.remove(&huc6("010100")));
        cache.clear();
        assert!(cache.is_empty());
    }
}
