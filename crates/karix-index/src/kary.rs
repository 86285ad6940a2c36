//! Static k-ary search index over a sorted snapshot.
//!
//! The index is an implicit, complete (k-1)-ary-pivot search tree stored in
//! one flat array, replacing a plain binary search with a k-way branching
//! descent over cache-dense pivot groups:
//!
//! ```text
//! snapshot C:    [(key, offset); N]   key-sorted, stable for equal keys
//! inner nodes I: [key; k^L - 1]       level order, k-1 pivots per node
//!
//!   layer 0: I[0 .. k-1)
//!   layer 1: I[k-1 .. k-1 + k*(k-1))
//!   ...
//! ```
//!
//! Pivots index evenly into the snapshot (`step = (hi - lo) / k`), so the
//! tree is balanced by construction. A lookup descends the inner layers to
//! a leaf subrange of `C`, binary-searches it, then scans outward for
//! duplicate keys. Rebuilds construct a whole new `(C, I)` bundle and
//! publish it atomically; searches never observe a partial state.

use karix_common::{IndexConfig, KarixError, Key, Offset, Result, Value};
use karix_store::{SnapshotEntry, TupleStore};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Immutable index state produced by one rebuild.
///
/// Everything a search touches lives here, so a reader holding the `Arc`
/// is unaffected by concurrent rebuilds.
#[derive(Debug)]
pub struct IndexSnapshot {
    /// Key-sorted entries; equal keys keep insertion (offset) order.
    entries: Box<[SnapshotEntry]>,
    /// Flat level-order pivot array of the implicit k-ary tree.
    inner_nodes: Box<[Key]>,
    key_min: Key,
    key_max: Key,
    fanout: usize,
    num_layers: usize,
}

/// Outcome of descending the inner layers.
enum Descent {
    /// The key matched a pivot; its snapshot position is the anchor.
    Anchor(usize),
    /// Inclusive leaf subrange of the snapshot left to binary-search.
    Leaf(i64, i64),
}

impl IndexSnapshot {
    fn empty(config: IndexConfig) -> Self {
        Self {
            entries: Box::new([]),
            inner_nodes: Box::new([]),
            key_min: 0,
            key_max: 0,
            fanout: config.fanout,
            num_layers: config.num_layers,
        }
    }

    /// Sorted snapshot entries.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Level-order pivot array.
    pub fn inner_nodes(&self) -> &[Key] {
        &self.inner_nodes
    }

    /// Cached `(key_min, key_max)` of the snapshot.
    pub fn key_range(&self) -> (Key, Key) {
        (self.key_min, self.key_max)
    }

    fn find(&self, key: Key, store: &TupleStore, values: &mut Vec<Value>) {
        if self.entries.is_empty() || key < self.key_min || key > self.key_max {
            return;
        }
        if self.key_min == self.key_max {
            // Degenerate snapshot: every entry carries the same key.
            if key == self.key_min {
                for entry in self.entries.iter() {
                    values.push(store.read(entry.offset));
                }
            }
            return;
        }

        let anchor = match self.descend(key) {
            Descent::Anchor(position) => position,
            Descent::Leaf(lo, hi) => match self.binary_search_leaf(key, lo, hi) {
                Some(position) => position,
                None => return,
            },
        };
        // Pivot slots of subtrees skipped during construction stay zero;
        // the anchor must be re-checked before anything is emitted.
        if self.entries[anchor].key != key {
            return;
        }

        let mut first = anchor;
        while first > 0 && self.entries[first - 1].key == key {
            first -= 1;
        }
        let mut last = anchor;
        while last + 1 < self.entries.len() && self.entries[last + 1].key == key {
            last += 1;
        }
        for entry in &self.entries[first..=last] {
            values.push(store.read(entry.offset));
        }
    }

    fn find_range(&self, lhs: Key, rhs: Key, store: &TupleStore, values: &mut Vec<Value>) {
        if self.entries.is_empty() || lhs > self.key_max || rhs < self.key_min {
            return;
        }

        let mut position = match self.descend(lhs) {
            Descent::Anchor(position) => position,
            Descent::Leaf(lo, hi) => self.lower_bound_leaf(lhs, lo, hi),
        };
        // Normalize to the leftmost entry with key >= lhs; the descent can
        // anchor mid-run of duplicates or, for degenerate subranges, land
        // slightly off the boundary.
        while position > 0 && self.entries[position - 1].key >= lhs {
            position -= 1;
        }
        while position < self.entries.len() && self.entries[position].key < lhs {
            position += 1;
        }

        while position < self.entries.len() && self.entries[position].key < rhs {
            values.push(store.read(self.entries[position].offset));
            position += 1;
        }
    }

    /// Descends the inner layers for `key`.
    fn descend(&self, key: Key) -> Descent {
        let last = self.entries.len() as i64 - 1;
        if self.num_layers == 0 {
            return Descent::Leaf(0, last);
        }
        self.descend_node(key, 0, last, 0, 0, 0)
    }

    /// Examines the pivot group at `inner_nodes[base + slot ..]` covering
    /// the inclusive snapshot subrange `[lo, hi]`.
    fn descend_node(
        &self,
        key: Key,
        lo: i64,
        hi: i64,
        base: usize,
        slot: usize,
        depth: usize,
    ) -> Descent {
        if depth == self.num_layers {
            return Descent::Leaf(lo, hi);
        }

        let k = self.fanout as i64;
        let step = (hi - lo) / k;
        let group = &self.inner_nodes[base + slot..base + slot + self.fanout - 1];

        for (i, &pivot) in group.iter().enumerate() {
            if key == pivot {
                return Descent::Anchor((lo + step * (i as i64 + 1)) as usize);
            }
        }

        let child_base = (base + 1) * self.fanout - 1;
        let child_slot = slot * self.fanout;
        for (i, &pivot) in group.iter().enumerate() {
            if key < pivot {
                let (child_lo, child_hi) = if i == 0 {
                    (lo, lo + step - 1)
                } else {
                    (lo + step * i as i64 + 1, lo + step * (i as i64 + 1) - 1)
                };
                return self.descend_node(
                    key,
                    child_lo,
                    child_hi,
                    child_base,
                    child_slot + i * (self.fanout - 1),
                    depth + 1,
                );
            }
        }
        self.descend_node(
            key,
            lo + step * (k - 1) + 1,
            hi,
            child_base,
            child_slot + (self.fanout - 1) * (self.fanout - 1),
            depth + 1,
        )
    }

    /// Binary search over the inclusive subrange `[lo, hi]`.
    fn binary_search_leaf(&self, key: Key, lo: i64, hi: i64) -> Option<usize> {
        let (mut lo, mut hi) = (lo, hi);
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let mid_key = self.entries[mid as usize].key;
            if mid_key == key {
                return Some(mid as usize);
            }
            if mid_key < key {
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }
        None
    }

    /// Leftmost position in `[lo, hi]` with key >= `key`; `hi + 1` when the
    /// whole subrange is smaller.
    fn lower_bound_leaf(&self, key: Key, lo: i64, hi: i64) -> usize {
        let (mut lo, mut hi) = (lo, hi + 1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entries[mid as usize].key < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo as usize
    }
}

/// Writes the level-order pivot array for a sorted snapshot.
struct InnerBuilder<'a> {
    entries: &'a [SnapshotEntry],
    inner_nodes: &'a mut [Key],
    fanout: usize,
    num_layers: usize,
}

impl InnerBuilder<'_> {
    fn build(&mut self) {
        let last = self.entries.len() as i64 - 1;
        self.subtree(0, last, 0, 0, 0);
    }

    /// Fills the pivot group for the inclusive subrange `[lo, hi]` at
    /// `inner_nodes[base + slot ..]` and recurses into the k children.
    fn subtree(&mut self, lo: i64, hi: i64, base: usize, slot: usize, depth: usize) {
        if lo > hi {
            return;
        }

        let k = self.fanout as i64;
        let step = (hi - lo) / k;
        for i in 0..self.fanout - 1 {
            let pivot = lo + step * (i as i64 + 1);
            self.inner_nodes[base + slot + i] = self.entries[pivot as usize].key;
        }
        if depth + 1 == self.num_layers {
            return;
        }

        let child_base = (base + 1) * self.fanout - 1;
        let child_slot = slot * self.fanout;
        self.subtree(lo, lo + step - 1, child_base, child_slot, depth + 1);
        for i in 1..self.fanout - 1 {
            self.subtree(
                lo + step * i as i64 + 1,
                lo + step * (i as i64 + 1) - 1,
                child_base,
                child_slot + i * (self.fanout - 1),
                depth + 1,
            );
        }
        self.subtree(
            lo + step * (k - 1) + 1,
            hi,
            child_base,
            child_slot + (self.fanout - 1) * (self.fanout - 1),
            depth + 1,
        );
    }
}

/// Static k-ary search index rebuilt wholesale from the tuple store.
///
/// Searches run lock-free against the published snapshot; `reorganize`
/// constructs a replacement bundle and swaps it in atomically.
pub struct StaticKaryIndex {
    store: Arc<TupleStore>,
    config: IndexConfig,
    /// Live snapshot handle; readers acquire it once per operation.
    state: RwLock<Arc<IndexSnapshot>>,
    /// Serializes rebuilds.
    rebuild_lock: Mutex<()>,
}

impl StaticKaryIndex {
    /// Creates an index over the given store.
    ///
    /// The index holds only a shared reference to the store; offsets it
    /// returns to callers remain owned by the store.
    pub fn new(store: Arc<TupleStore>, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            state: RwLock::new(Arc::new(IndexSnapshot::empty(config))),
            rebuild_lock: Mutex::new(()),
        })
    }

    /// Rebuilds the snapshot and inner layers from the store's current
    /// contents and publishes them atomically.
    ///
    /// Fails with `InsufficientData` if the configured tree has as many
    /// inner nodes as there are tuples; the previous state stays live.
    pub fn reorganize(&self) -> Result<()> {
        let _guard = self.rebuild_lock.lock();

        let entries = self.store.project_sorted();
        let inner_len = self.config.inner_node_count();
        if inner_len >= entries.len() {
            return Err(KarixError::InsufficientData {
                inner_nodes: inner_len,
                tuples: entries.len(),
            });
        }

        let entries = entries.into_boxed_slice();
        let key_min = entries[0].key;
        let key_max = entries[entries.len() - 1].key;

        let mut inner_nodes = vec![0; inner_len].into_boxed_slice();
        if self.config.num_layers > 0 {
            InnerBuilder {
                entries: &entries,
                inner_nodes: &mut inner_nodes,
                fanout: self.config.fanout,
                num_layers: self.config.num_layers,
            }
            .build();
        }

        let snapshot = Arc::new(IndexSnapshot {
            entries,
            inner_nodes,
            key_min,
            key_max,
            fanout: self.config.fanout,
            num_layers: self.config.num_layers,
        });
        *self.state.write() = snapshot;
        Ok(())
    }

    /// Appends the value of every tuple with the given key, in insertion
    /// order.
    pub fn find(&self, key: Key, values: &mut Vec<Value>) {
        let snapshot = self.snapshot();
        snapshot.find(key, &self.store, values);
    }

    /// Appends the value of every tuple with key in `[lhs, rhs)`, in
    /// snapshot order. Requires `lhs < rhs`.
    pub fn find_range(&self, lhs: Key, rhs: Key, values: &mut Vec<Value>) -> Result<()> {
        if lhs >= rhs {
            return Err(KarixError::InvalidRange { lhs, rhs });
        }
        let snapshot = self.snapshot();
        snapshot.find_range(lhs, rhs, &self.store, values);
        Ok(())
    }

    /// Number of tuples in the published snapshot.
    pub fn size(&self) -> usize {
        self.snapshot().entries.len()
    }

    /// Returns the currently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.state.read().clone()
    }

    /// Dumps the inner pivots in level order. Testing aid.
    pub fn print(&self) {
        let snapshot = self.snapshot();
        if snapshot.inner_nodes.is_empty() {
            return;
        }
        let line = snapshot
            .inner_nodes
            .iter()
            .map(|key| key.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}", line);
    }
}

impl crate::OrderedIndex for StaticKaryIndex {
    /// The static index picks new tuples up at the next `reorganize`.
    fn insert(&self, _key: Key, _offset: Offset) -> Result<()> {
        Ok(())
    }

    fn reorganize(&self) -> Result<()> {
        StaticKaryIndex::reorganize(self)
    }

    fn find(&self, key: Key, values: &mut Vec<Value>) {
        StaticKaryIndex::find(self, key, values)
    }

    fn find_range(&self, lhs: Key, rhs: Key, values: &mut Vec<Value>) -> Result<()> {
        StaticKaryIndex::find_range(self, lhs, rhs, values)
    }

    fn size(&self) -> usize {
        StaticKaryIndex::size(self)
    }
}
