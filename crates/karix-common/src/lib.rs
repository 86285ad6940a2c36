//! Karix common types, errors, and configuration.
//!
//! This crate provides shared definitions used across all karix components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{IndexConfig, KeyDistribution, WorkloadConfig};
pub use error::{KarixError, Result};
pub use types::{Key, Offset, Value};
