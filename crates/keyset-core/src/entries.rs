//! Insertion-ordered map with O(log n) removal.
//!
//! Entries are filed under a monotonically increasing sequence number, so
//! removing one never reshuffles the others and `pop_first` always yields
//! the oldest surviving entry.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Clone, Debug)]
pub(crate) struct Entries<K, V> {
    next_seq: u64,
    order: BTreeMap<u64, (K, V)>,
    index: HashMap<K, u64>,
}

impl<K: Clone + Eq + Hash, V> Entries<K, V> {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            order: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let seq = self.index.get(key)?;
        self.order.get(seq).map(|(_, value)| value)
    }

    /// Insert at the back unless `key` is present. Returns whether it inserted.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(key.clone(), seq);
        self.order.insert(seq, (key, value));
        true
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let seq = self.index.remove(key)?;
        self.order.remove(&seq).map(|(_, value)| value)
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let (_, (key, value)) = self.order.pop_first()?;
        self.index.remove(&key);
        Some((key, value))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order.values().map(|(key, value)| (key, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.order.values().map(|(_, value)| value)
    }
}

impl<K: Clone + Eq + Hash, V> Default for Entries<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_survives_removal() {
        let mut entries = Entries::new();
        for n in 1..=5 {
            assert!(entries.insert(n, n * 10));
        }
        assert_eq!(entries.remove(&3), Some(30));
        assert!(entries.insert(3, 33));

        let keys: Vec<_> = entries.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 4, 5, 3]);
    }

    #[test]
    fn test_insert_keeps_existing_value() {
        let mut entries = Entries::new();
        assert!(entries.insert("a", 1));
        assert!(!entries.insert("a", 2));
        assert_eq!(entries.get(&"a"), Some(&1));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_pop_first() {
        let mut entries = Entries::new();
        entries.insert('x', ());
        entries.insert('y', ());
        assert_eq!(entries.pop_first(), Some(('x', ())));
        assert!(!entries.contains_key(&'x'));
        assert_eq!(entries.pop_first(), Some(('y', ())));
        assert_eq!(entries.pop_first(), None);
        assert!(entries.is_empty());
    }
}
