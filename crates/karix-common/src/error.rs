//! Error types for karix.

use thiserror::Error;

/// Result type alias using KarixError.
pub type Result<T> = std::result::Result<T, KarixError>;

/// Errors that can occur in karix operations.
#[derive(Debug, Error)]
pub enum KarixError {
    // Index configuration errors
    #[error("Invalid fanout: {fanout} (must be at least 2)")]
    InvalidFanout { fanout: usize },

    #[error("Insufficient data: {inner_nodes} inner nodes require more than {tuples} tuples")]
    InsufficientData { inner_nodes: usize, tuples: usize },

    // Search precondition errors
    #[error("Invalid range: lhs {lhs} must be less than rhs {rhs}")]
    InvalidRange { lhs: u64, rhs: u64 },

    // Workload configuration errors
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}
