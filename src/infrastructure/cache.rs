use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded least-recently-used map
pub struct Cache<K, V> {
    inner: LruCache<K, V>,
}

impl<K: std::hash::Hash + Eq, V> Cache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Cache {
            inner: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = Cache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&"b").is_none());
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = Cache::new(0);
        cache.insert(1, "x");
        cache.insert(2, "y");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remove(&2), Some("y"));
        assert!(cache.is_empty());
    }
}
