use indexmap::IndexMap;
use std::hash::Hash;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Fixed-capacity map with least-recently-used eviction.
///
/// Entries are kept in recency order: index 0 is the next eviction victim,
/// the last index is the freshest. Not synchronized; callers that share it
/// wrap it in a lock.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            entries: IndexMap::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        self.entries.get_index(last).map(|(_, v)| v)
    }

    /// Insert or overwrite `key`, mark it most recently used, and evict the
    /// least recently used entry if the cache grew past capacity.
    ///
    /// Returns the evicted entry, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        // shift_remove keeps the relative order of everything else
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);

        if self.entries.len() > self.capacity {
            return self.entries.shift_remove_index(0);
        }
        None
    }

    /// Read without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Keep only entries for which `keep` returns true. Survivors keep their
    /// recency order. Returns the number of removed entries.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|k, v| keep(k, v));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K: Hash + Eq, V> Default for BoundedCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(cache: &BoundedCache<String, u32>) -> Vec<String> {
        cache.iter().map(|(k, _)| k.clone()).collect()
    }

    #[test]
    fn test_evicts_least_recent_on_overflow() {
        let mut cache = BoundedCache::new(2);
        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);
        let evicted = cache.put("c".to_string(), 3);

        assert_eq!(evicted, Some(("a".to_string(), 1)));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key(&"a".to_string()));
        assert!(cache.contains_key(&"b".to_string()));
        assert!(cache.contains_key(&"c".to_string()));
    }

    #[test]
    fn test_keeps_most_recent_keys() {
        let capacity = 5;
        let mut cache = BoundedCache::new(capacity);
        for i in 0..20u32 {
            cache.put(format!("k{}", i), i);
            assert!(cache.len() <= capacity);
        }

        let expected: Vec<String> = (15..20).map(|i| format!("k{}", i)).collect();
        assert_eq!(keys(&cache), expected);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = BoundedCache::new(2);
        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);

        assert_eq!(cache.get(&"a".to_string()), Some(&1));
        cache.put("c".to_string(), 3);

        assert!(cache.contains_key(&"a".to_string()));
        assert!(!cache.contains_key(&"b".to_string()));
    }

    #[test]
    fn test_put_overwrites_and_refreshes() {
        let mut cache = BoundedCache::new(2);
        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);
        assert!(cache.put("a".to_string(), 10).is_none());

        cache.put("c".to_string(), 3);
        assert_eq!(cache.peek(&"a".to_string()), Some(&10));
        assert!(!cache.contains_key(&"b".to_string()));
    }

    #[test]
    fn test_get_missing_key() {
        let mut cache: BoundedCache<String, u32> = BoundedCache::new(3);
        assert!(cache.get(&"nope".to_string()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut cache = BoundedCache::new(4);
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.put(k.to_string(), i as u32);
        }
        let removed = cache.retain(|_, v| v % 2 == 1);

        assert_eq!(removed, 2);
        assert_eq!(keys(&cache), vec!["b".to_string(), "d".to_string()]);
    }
}
