//! Ordered index implementations for karix.
//!
//! Two index families share one driver-facing trait:
//!
//! - [`StaticKaryIndex`]: an implicit k-ary search tree laid out in a flat
//!   pivot array over a key-sorted snapshot. Immutable between rebuilds;
//!   `reorganize` regenerates it wholesale from the tuple store.
//! - [`DynamicBTreeIndex`]: an ordered map applying every insert
//!   immediately, the mutable counterpart the benchmark contrasts against.

mod dynamic;
mod kary;

pub use dynamic::DynamicBTreeIndex;
pub use kary::{IndexSnapshot, StaticKaryIndex};

use karix_common::{Key, Offset, Result, Value};

/// Driver-facing contract shared by the static and dynamic indexes.
pub trait OrderedIndex: Send + Sync {
    /// Makes a newly stored tuple visible to the index.
    ///
    /// Dynamic indexes apply the insert immediately. The static index
    /// ignores it; the tuple becomes visible at the next `reorganize`.
    fn insert(&self, key: Key, offset: Offset) -> Result<()>;

    /// Rebuilds the index from the store's current contents.
    fn reorganize(&self) -> Result<()>;

    /// Appends the value of every tuple whose key equals `key`, in the
    /// order those tuples were inserted into the store.
    fn find(&self, key: Key, values: &mut Vec<Value>);

    /// Appends the value of every tuple whose key falls in `[lhs, rhs)`,
    /// in snapshot order. Requires `lhs < rhs`.
    fn find_range(&self, lhs: Key, rhs: Key, values: &mut Vec<Value>) -> Result<()>;

    /// Number of tuples visible to the index.
    fn size(&self) -> usize;
}
