use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::pattern::DetectionVerdict;

struct CacheInner {
    entries: HashMap<u64, DetectionVerdict>,
    order: VecDeque<u64>,
    config_version: u64,
}

/// Bounded detection cache keyed by input hash. Oldest entries are evicted
/// first. Entries belong to one configuration version; a lookup under a
/// newer version empties the cache.
pub struct DetectionCache {
    inner: Mutex<CacheInner>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                config_version: 0,
            }),
        }
    }

    fn sync_version(inner: &mut CacheInner, config_version: u64) {
        if inner.config_version != config_version {
            inner.entries.clear();
            inner.order.clear();
            inner.config_version = config_version;
        }
    }

    pub fn get(&self, key: u64, config_version: u64) -> Option<DetectionVerdict> {
        let mut inner = self.inner.lock();
        Self::sync_version(&mut inner, config_version);
        inner.entries.get(&key).cloned()
    }

    pub fn insert(&self, key: u64, config_version: u64, capacity: usize, verdict: DetectionVerdict) {
        let mut inner = self.inner.lock();
        Self::sync_version(&mut inner, config_version);
        if inner.entries.insert(key, verdict).is_none() {
            inner.order.push_back(key);
        }
        while inner.order.len() > capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl Default for DetectionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Severity;

    fn verdict(hash: &str) -> DetectionVerdict {
        DetectionVerdict::from_patterns(vec![], &[Severity::High], false, hash.into(), 1)
    }

    #[test]
    fn evicts_oldest_first() {
        let cache = DetectionCache::new();
        for key in 0..5u64 {
            cache.insert(key, 1, 3, verdict(&key.to_string()));
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get(0, 1).is_none());
        assert!(cache.get(1, 1).is_none());
        assert!(cache.get(4, 1).is_some());
    }

    #[test]
    fn new_config_version_invalidates() {
        let cache = DetectionCache::new();
        cache.insert(7, 1, 10, verdict("7"));
        assert!(cache.get(7, 1).is_some());
        assert!(cache.get(7, 2).is_none());
        assert!(cache.is_empty());
    }
}
