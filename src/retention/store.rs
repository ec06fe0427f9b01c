//! Retained Cache Module
//!
//! Count- and age-bounded map of protocol objects owned by a live session.

use std::collections::HashMap;
use std::time::Instant;

use crate::retention::{RecencyOrder, RetainedEntry, RetentionPolicy, RetentionStats};

// == Retained Cache ==
/// Objects keyed by id, evicted least-recently-used first once the policy's
/// ceiling is reached and dropped once older than the policy's TTL.
#[derive(Debug)]
pub struct RetainedCache<T> {
    /// Retained objects by id
    entries: HashMap<String, RetainedEntry<T>>,
    /// Eviction order
    order: RecencyOrder,
    /// Counters
    stats: RetentionStats,
    /// Limits
    policy: RetentionPolicy,
}

impl<T: Clone> RetainedCache<T> {
    // == Constructor ==
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            order: RecencyOrder::new(),
            stats: RetentionStats::new(),
            policy,
        }
    }

    // == Record ==
    /// Retains `value` under `id`, replacing any previous object and evicting
    /// the least recently used ones beyond the ceiling.
    ///
    /// A policy with a zero ceiling retains nothing.
    pub fn record(&mut self, id: impl Into<String>, value: T) {
        if self.policy.max_entries == 0 {
            return;
        }

        let id = id.into();
        self.entries
            .insert(id.clone(), RetainedEntry::new(value, self.policy.ttl));
        self.order.touch(&id);

        let evicted = self.order.shrink_to(self.policy.max_entries);
        for id in &evicted {
            self.entries.remove(id);
        }
        self.stats.record_evictions(evicted.len());
        self.stats.set_retained(self.entries.len());
    }

    // == Get ==
    /// Returns a retained object, dropping it instead if it has aged out.
    pub fn get(&mut self, id: &str) -> Option<T> {
        let expired = self.entries.get(id)?.is_expired();
        if expired {
            self.entries.remove(id);
            self.order.forget(id);
            self.stats.record_expirations(1);
            self.stats.set_retained(self.entries.len());
            return None;
        }

        self.order.touch(id);
        self.entries.get(id).map(|entry| entry.value.clone())
    }

    // == Remove ==
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let entry = self.entries.remove(id)?;
        self.order.forget(id);
        self.stats.set_retained(self.entries.len());
        Some(entry.value)
    }

    // == Purge Expired ==
    /// Drops every aged-out object. Returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.entries.remove(id);
            self.order.forget(id);
        }

        self.stats.record_expirations(expired.len());
        self.stats.set_retained(self.entries.len());
        expired.len()
    }

    // == Clear ==
    /// Drops everything. Counters other than occupancy are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_retained(0);
    }

    /// Retained objects, most recently recorded first.
    pub fn values(&self) -> Vec<T> {
        let mut values: Vec<(&Instant, &T)> = self
            .entries
            .values()
            .map(|entry| (&entry.recorded_at, &entry.value))
            .collect();
        values.sort_by(|a, b| b.0.cmp(a.0));
        values.into_iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn stats(&self) -> RetentionStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_record_and_get() {
        let mut cache = RetainedCache::new(RetentionPolicy::bounded(10));
        cache.record("1", "hello".to_string());

        assert_eq!(cache.get("1"), Some("hello".to_string()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().retained, 1);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut cache = RetainedCache::new(RetentionPolicy::bounded(10));
        cache.record("1", 1);
        cache.record("1", 2);

        assert_eq!(cache.get("1"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ceiling_evicts_least_recent() {
        let mut cache = RetainedCache::new(RetentionPolicy::bounded(3));
        cache.record("a", 1);
        cache.record("b", 2);
        cache.record("c", 3);

        // Read a so b becomes the oldest
        cache.get("a");
        cache.record("d", 4);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_zero_ceiling_retains_nothing() {
        let mut cache = RetainedCache::new(RetentionPolicy::none());
        cache.record("a", 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_ttl_expiry_on_get() {
        let mut cache = RetainedCache::new(RetentionPolicy {
            max_entries: 10,
            ttl: Some(Duration::from_millis(20)),
        });
        cache.record("a", 1);
        assert_eq!(cache.get("a"), Some(1));

        sleep(Duration::from_millis(40));

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = RetainedCache::new(RetentionPolicy {
            max_entries: 10,
            ttl: Some(Duration::from_millis(20)),
        });
        cache.record("a", 1);
        cache.record("b", 2);

        sleep(Duration::from_millis(40));

        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().retained, 0);
    }

    #[test]
    fn test_clear_and_remove() {
        let mut cache = RetainedCache::new(RetentionPolicy::bounded(10));
        cache.record("a", 1);
        cache.record("b", 2);

        assert_eq!(cache.remove("a"), Some(1));
        assert_eq!(cache.remove("a"), None);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().retained, 0);
    }
}
