use std::collections::{HashSet, VecDeque};

use crate::constants::DEFAULT_DEDUP_CAPACITY;

/// Bounded set of push delivery ids already acted on.
///
/// When full, the oldest half is evicted in one sweep. Insertion order is kept
/// exactly, so "oldest" means first recorded.
#[derive(Debug)]
pub struct DedupGuard {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

impl DedupGuard {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record an id. Returns true if it was not already recorded.
    pub fn record(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            self.evict_oldest_half();
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    fn evict_oldest_half(&mut self) {
        let evict = self.order.len() / 2;
        for id in self.order.drain(..evict) {
            self.seen.remove(&id);
        }
        tracing::debug!(evicted = evict, remaining = self.order.len(), "dedup guard swept");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_seen() {
        let mut guard = DedupGuard::new(10);
        assert!(!guard.seen("a"));
        assert!(guard.record("a"));
        assert!(guard.seen("a"));
        assert!(!guard.record("a"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_overflow_evicts_oldest_half_in_one_sweep() {
        let mut guard = DedupGuard::new(1000);
        let mut max_len = 0;
        for i in 0..1000 {
            guard.record(&i.to_string());
            max_len = max_len.max(guard.len());
        }
        assert_eq!(guard.len(), 1000);

        guard.record("1000");
        max_len = max_len.max(guard.len());

        assert!(max_len <= 1000);
        assert_eq!(guard.len(), 501);
        assert!(!guard.seen("0"));
        assert!(!guard.seen("499"));
        assert!(guard.seen("500"));
        assert!(guard.seen("999"));
        assert!(guard.seen("1000"));
    }

    #[test]
    fn test_evicted_ids_can_be_recorded_again() {
        let mut guard = DedupGuard::new(4);
        for id in ["a", "b", "c", "d", "e"] {
            guard.record(id);
        }
        assert!(!guard.seen("a"));
        assert!(guard.record("a"));
        assert!(guard.seen("e"));
    }
}
