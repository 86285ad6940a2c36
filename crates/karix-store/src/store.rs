//! Append-only tuple store with stable offsets.
//!
//! Tuples live in fixed-capacity column segments. Inserts claim a global
//! slot with a fetch-add, write both columns, then advance a commit
//! watermark; projections and reads below the watermark need no lock.

use karix_common::{Key, Offset, Value};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Number of tuples per segment.
pub const SEGMENT_CAPACITY: usize = 1 << 16;

const SEGMENT_SHIFT: usize = 16;
const SLOT_MASK: usize = SEGMENT_CAPACITY - 1;

/// One entry of a sorted snapshot projected from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Tuple key.
    pub key: Key,
    /// Handle resolving back to the tuple's value.
    pub offset: Offset,
}

/// Fixed-capacity column segment.
///
/// Keys and values sit in separate preallocated arrays so a projection
/// walks the key column without touching values.
struct Segment {
    keys: Box<[AtomicU64]>,
    values: Box<[AtomicU64]>,
}

impl Segment {
    fn new() -> Self {
        let column = || {
            (0..SEGMENT_CAPACITY)
                .map(|_| AtomicU64::new(0))
                .collect::<Vec<_>>()
                .into_boxed_slice()
        };
        Self {
            keys: column(),
            values: column(),
        }
    }
}

/// Append-only (key, value) store handing out stable 64-bit offsets.
///
/// Safe for concurrent inserters and readers. An offset returned from
/// `insert` resolves for the lifetime of the store; index rebuilds on top
/// never invalidate it.
pub struct TupleStore {
    /// Segment directory; grows under the write lock, cloned cheaply by
    /// readers.
    segments: RwLock<Vec<Arc<Segment>>>,
    /// Next unclaimed slot.
    next_slot: AtomicU64,
    /// Slots below this are fully written and visible to projections.
    committed: AtomicU64,
}

impl TupleStore {
    /// Creates an empty store with one preallocated segment.
    pub fn new() -> Self {
        Self {
            segments: RwLock::new(vec![Arc::new(Segment::new())]),
            next_slot: AtomicU64::new(0),
            committed: AtomicU64::new(0),
        }
    }

    /// Appends a tuple and returns its stable offset.
    pub fn insert(&self, key: Key, value: Value) -> Offset {
        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        let segment = self.segment_for(slot);
        let index = slot as usize & SLOT_MASK;
        segment.keys[index].store(key, Ordering::Relaxed);
        segment.values[index].store(value, Ordering::Release);

        // Publish in claim order: wait for earlier slots, then move the
        // watermark past ours. The release CAS chain makes every write up
        // to the watermark visible to an acquire load of `committed`.
        while self
            .committed
            .compare_exchange_weak(slot, slot + 1, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        Offset::new(slot)
    }

    /// Resolves an offset previously returned from `insert`.
    pub fn read(&self, offset: Offset) -> Value {
        let slot = offset.raw();
        debug_assert!(slot < self.committed.load(Ordering::Acquire));
        let segment = {
            let segments = self.segments.read();
            segments[slot as usize >> SEGMENT_SHIFT].clone()
        };
        segment.values[slot as usize & SLOT_MASK].load(Ordering::Acquire)
    }

    /// Upper bound on the number of stored tuples.
    pub fn size_approx(&self) -> u64 {
        self.next_slot.load(Ordering::Relaxed)
    }

    /// Number of tuples visible to a projection taken now.
    pub fn committed_len(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }

    /// Projects a point-in-time, key-sorted cut of the store.
    ///
    /// The sort is stable, so equal keys keep offset (insertion) order.
    /// Tuples inserted after the cut are not included.
    pub fn project_sorted(&self) -> Vec<SnapshotEntry> {
        let visible = self.committed.load(Ordering::Acquire);
        let segments = self.segments.read().clone();

        let mut entries = Vec::with_capacity(visible as usize);
        for slot in 0..visible {
            let segment = &segments[slot as usize >> SEGMENT_SHIFT];
            entries.push(SnapshotEntry {
                key: segment.keys[slot as usize & SLOT_MASK].load(Ordering::Relaxed),
                offset: Offset::new(slot),
            });
        }
        entries.sort_by_key(|entry| entry.key);
        entries
    }

    /// Returns the segment holding `slot`, growing the directory if the
    /// slot crossed into unallocated space.
    fn segment_for(&self, slot: u64) -> Arc<Segment> {
        let segment_index = slot as usize >> SEGMENT_SHIFT;
        {
            let segments = self.segments.read();
            if segment_index < segments.len() {
                return segments[segment_index].clone();
            }
        }

        let mut segments = self.segments.write();
        while segments.len() <= segment_index {
            segments.push(Arc::new(Segment::new()));
        }
        segments[segment_index].clone()
    }
}

impl Default for TupleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::thread;

    #[test]
    fn test_insert_read_roundtrip() {
        let store = TupleStore::new();
        let a = store.insert(10, 100);
        let b = store.insert(20, 200);

        assert_eq!(store.read(a), 100);
        assert_eq!(store.read(b), 200);
        assert_ne!(a, b);
    }

    #[test]
    fn test_size_approx_counts_inserts() {
        let store = TupleStore::new();
        assert_eq!(store.size_approx(), 0);

        for i in 0..100 {
            store.insert(i, i);
        }
        assert_eq!(store.size_approx(), 100);
        assert_eq!(store.committed_len(), 100);
    }

    #[test]
    fn test_offsets_are_stable_across_growth() {
        let store = TupleStore::new();
        let offsets: Vec<_> = (0..(SEGMENT_CAPACITY as u64 * 2 + 10))
            .map(|i| store.insert(i, i * 2))
            .collect();

        for (i, offset) in offsets.iter().enumerate() {
            assert_eq!(store.read(*offset), i as u64 * 2);
        }
    }

    #[test]
    fn test_project_sorted_orders_by_key() {
        let store = TupleStore::new();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let key = rng.gen_range(0..500u64);
            store.insert(key, key);
        }

        let entries = store.project_sorted();
        assert_eq!(entries.len(), 1000);
        assert!(entries.windows(2).all(|w| w[0].key <= w[1].key));
    }

    #[test]
    fn test_project_sorted_is_stable_for_duplicates() {
        let store = TupleStore::new();
        // Interleave duplicates of key 5 with other keys.
        for key in [5u64, 1, 5, 9, 5, 3, 5] {
            store.insert(key, key);
        }

        let entries = store.project_sorted();
        let fives: Vec<_> = entries
            .iter()
            .filter(|entry| entry.key == 5)
            .map(|entry| entry.offset.raw())
            .collect();
        assert_eq!(fives, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_projection_excludes_later_inserts() {
        let store = TupleStore::new();
        store.insert(1, 1);
        let entries = store.project_sorted();
        store.insert(2, 2);

        assert_eq!(entries.len(), 1);
        assert_eq!(store.project_sorted().len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_all_visible() {
        const THREADS: u64 = 4;
        const PER_THREAD: u64 = 10_000;

        let store = Arc::new(TupleStore::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    let mut offsets = Vec::with_capacity(PER_THREAD as usize);
                    for i in 0..PER_THREAD {
                        offsets.push(store.insert(t * PER_THREAD + i, t));
                    }
                    offsets
                })
            })
            .collect();

        for handle in handles {
            let offsets = handle.join().unwrap();
            // Per-inserter FIFO: each thread's offsets are strictly increasing.
            assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        }

        assert_eq!(store.committed_len(), THREADS * PER_THREAD);
        let entries = store.project_sorted();
        assert_eq!(entries.len(), (THREADS * PER_THREAD) as usize);
        assert!(entries.windows(2).all(|w| w[0].key <= w[1].key));
    }
}
