//! Core value types shared across the karix crates.

use serde::{Deserialize, Serialize};

/// Index key. All karix indexes operate on fixed-width unsigned keys.
pub type Key = u64;

/// Tuple value stored alongside a key.
pub type Value = u64;

/// Opaque handle identifying a tuple in the tuple store.
///
/// Offsets are handed out by `insert` and stay valid for the lifetime of
/// the store; index rebuilds do not invalidate them. Index code treats the
/// contents as opaque and only hands offsets back to the store for
/// resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Offset(u64);

impl Offset {
    /// Creates an offset from its raw slot number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw slot number.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
