//! Dynamic ordered-map index.

use crate::OrderedIndex;
use karix_common::{KarixError, Key, Offset, Result, Value};
use karix_store::TupleStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ordered-map index applying every insert immediately.
///
/// The mutable counterpart the benchmark contrasts against the static
/// k-ary index. Per-key offset lists preserve insertion order, so
/// duplicate enumeration matches the static index's contract.
pub struct DynamicBTreeIndex {
    store: Arc<TupleStore>,
    map: RwLock<BTreeMap<Key, Vec<Offset>>>,
    len: AtomicUsize,
}

impl DynamicBTreeIndex {
    /// Creates an empty index over the given store.
    pub fn new(store: Arc<TupleStore>) -> Self {
        Self {
            store,
            map: RwLock::new(BTreeMap::new()),
            len: AtomicUsize::new(0),
        }
    }
}

impl OrderedIndex for DynamicBTreeIndex {
    fn insert(&self, key: Key, offset: Offset) -> Result<()> {
        self.map.write().entry(key).or_default().push(offset);
        self.len.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// The map is always current; nothing to rebuild.
    fn reorganize(&self) -> Result<()> {
        Ok(())
    }

    fn find(&self, key: Key, values: &mut Vec<Value>) {
        let map = self.map.read();
        if let Some(offsets) = map.get(&key) {
            for &offset in offsets {
                values.push(self.store.read(offset));
            }
        }
    }

    fn find_range(&self, lhs: Key, rhs: Key, values: &mut Vec<Value>) -> Result<()> {
        if lhs >= rhs {
            return Err(KarixError::InvalidRange { lhs, rhs });
        }
        let map = self.map.read();
        for offsets in map.range(lhs..rhs).map(|(_, offsets)| offsets) {
            for &offset in offsets {
                values.push(self.store.read(offset));
            }
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(keys: &[Key]) -> (Arc<TupleStore>, DynamicBTreeIndex) {
        let store = Arc::new(TupleStore::new());
        let index = DynamicBTreeIndex::new(store.clone());
        for (i, &key) in keys.iter().enumerate() {
            let offset = store.insert(key, i as Value + 1);
            index.insert(key, offset).unwrap();
        }
        (store, index)
    }

    #[test]
    fn test_find_single_key() {
        let (_store, index) = seeded(&[10, 20, 30]);
        let mut values = Vec::new();
        index.find(20, &mut values);
        assert_eq!(values, vec![2]);
    }

    #[test]
    fn test_find_missing_key() {
        let (_store, index) = seeded(&[10, 20, 30]);
        let mut values = Vec::new();
        index.find(25, &mut values);
        assert!(values.is_empty());
    }

    #[test]
    fn test_duplicates_keep_insertion_order() {
        let (_store, index) = seeded(&[3, 1, 3, 2, 3, 4, 3, 5]);
        let mut values = Vec::new();
        index.find(3, &mut values);
        assert_eq!(values, vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_find_range_half_open() {
        let keys: Vec<Key> = (1..=26).collect();
        let (_store, index) = seeded(&keys);
        let mut values = Vec::new();
        index.find_range(5, 9, &mut values).unwrap();
        assert_eq!(values, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_find_range_rejects_bad_precondition() {
        let (_store, index) = seeded(&[1, 2, 3]);
        let mut values = Vec::new();
        assert!(index.find_range(5, 5, &mut values).is_err());
        assert!(index.find_range(9, 5, &mut values).is_err());
    }

    #[test]
    fn test_size_counts_tuples_not_keys() {
        let (_store, index) = seeded(&[7, 7, 7, 1]);
        assert_eq!(index.size(), 4);
    }

    #[test]
    fn test_inserts_visible_immediately() {
        let (store, index) = seeded(&[1]);
        let offset = store.insert(99, 42);
        index.insert(99, offset).unwrap();

        let mut values = Vec::new();
        index.find(99, &mut values);
        assert_eq!(values, vec![42]);
    }
}
