//! TTL cache for place lookups.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::places::types::{PlaceDetail, PlaceSummary};

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe cache for search results and place details.
pub struct PlacesCache {
    ttl: Duration,
    max_entries: usize,
    searches: Arc<DashMap<String, CacheEntry<Vec<PlaceSummary>>>>,
    details: Arc<DashMap<String, CacheEntry<PlaceDetail>>>,
}

impl PlacesCache {
    /// Create a cache; a zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            searches: Arc::new(DashMap::new()),
            details: Arc::new(DashMap::new()),
        }
    }

    fn enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    /// Cached search results for a normalized query.
    #[must_use]
    pub fn get_search(&self, query: &str) -> Option<Vec<PlaceSummary>> {
        if !self.enabled() {
            return None;
        }
        lookup(&self.searches, &search_key(query))
    }

    /// Cache search results.
    pub fn set_search(&self, query: &str, results: &[PlaceSummary]) {
        if !self.enabled() {
            return;
        }
        self.enforce_max_entries(&self.searches);
        self.searches.insert(
            search_key(query),
            CacheEntry::new(results.to_vec(), self.ttl),
        );
    }

    /// Cached detail for a place id.
    #[must_use]
    pub fn get_detail(&self, place_id: &str) -> Option<PlaceDetail> {
        if !self.enabled() {
            return None;
        }
        lookup(&self.details, place_id)
    }

    /// Cache a place detail.
    pub fn set_detail(&self, place_id: &str, detail: &PlaceDetail) {
        if !self.enabled() {
            return;
        }
        self.enforce_max_entries(&self.details);
        self.details
            .insert(place_id.to_string(), CacheEntry::new(detail.clone(), self.ttl));
    }

    /// Total live and expired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.searches.len() + self.details.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enforce_max_entries<T: Clone>(&self, cache: &DashMap<String, CacheEntry<T>>) {
        let max_per_cache = (self.max_entries / 2).max(1);
        if cache.len() < max_per_cache {
            return;
        }
        cache.retain(|_, entry| !entry.is_expired());

        if cache.len() >= max_per_cache {
            let to_remove = cache.len() - max_per_cache + 1;
            let keys: Vec<String> = cache
                .iter()
                .take(to_remove)
                .map(|entry| entry.key().clone())
                .collect();
            for key in keys {
                cache.remove(&key);
            }
        }
    }
}

fn search_key(query: &str) -> String {
    query.trim().to_lowercase()
}

fn lookup<T: Clone>(cache: &DashMap<String, CacheEntry<T>>, key: &str) -> Option<T> {
    cache.get(key).and_then(|entry| {
        if entry.is_expired() {
            drop(entry);
            cache.remove(key);
            None
        } else {
            Some(entry.data.clone())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> PlaceSummary {
        PlaceSummary {
            name: name.to_string(),
            place_id: None,
            lat: 10.77,
            lng: 106.69,
            address: None,
            rating: None,
            thumbnail: None,
        }
    }

    #[test]
    fn test_search_key_is_normalized() {
        let cache = PlacesCache::new(Duration::from_secs(60), 10);
        cache.set_search("  Bến Thành ", &[summary("Chợ Bến Thành")]);
        assert_eq!(cache.get_search("bến thành").unwrap().len(), 1);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = PlacesCache::new(Duration::from_nanos(1), 10);
        cache.set_search("q", &[summary("x")]);
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get_search("q").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = PlacesCache::new(Duration::ZERO, 10);
        cache.set_search("q", &[summary("x")]);
        assert!(cache.get_search("q").is_none());
    }

    #[test]
    fn test_max_entries_enforced() {
        let cache = PlacesCache::new(Duration::from_secs(60), 4);
        for i in 0..10 {
            cache.set_search(&format!("q{i}"), &[summary("x")]);
        }
        assert!(cache.len() <= 2);
    }
}
