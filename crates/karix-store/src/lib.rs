//! In-memory tuple storage for karix.
//!
//! This crate provides:
//! - An append-only, segmented (key, value) store with stable offsets
//! - Point-in-time sorted projections consumed by index rebuilds

mod store;

pub use store::{SnapshotEntry, TupleStore, SEGMENT_CAPACITY};
