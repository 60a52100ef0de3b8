//! Insertion-ordered map with first-in-first-out eviction.

use std::collections::{HashMap, VecDeque};

/// String-keyed map that remembers insertion order and evicts the
/// oldest-inserted key once `capacity` is exceeded.
///
/// Overwriting an existing key keeps its original position; reads never
/// change the order.
#[derive(Debug, Clone)]
pub struct BoundedMap<V> {
    entries: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl<V> BoundedMap<V> {
    /// `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Insert or overwrite. Returns the keys evicted to honour the bound.
    pub fn insert(&mut self, key: String, value: V) -> Vec<String> {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }

        let mut evicted = Vec::new();
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                        evicted.push(oldest);
                    }
                    None => break,
                }
            }
        }
        evicted
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Entries from oldest to newest insertion.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v)))
    }
}
