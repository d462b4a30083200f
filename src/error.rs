// Error taxonomy for the store.
//
// Typed errors at the core (this module); `anyhow` with `.context(..)` at
// the CLI/HTTP boundary, matching the rest of the crate's layering.

use thiserror::Error;

/// Errors produced by the document map, index manager, and mmap region.
///
/// Variants line up with the taxonomy in the design notes: configuration
/// errors, client input errors, I/O errors, and codec errors. Consistency
/// violations (an index referencing a key the document map no longer has)
/// are deliberately not a variant here — they are filtered silently at
/// search time rather than surfaced as errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown index type: {0}")]
    UnknownIndexType(String),

    #[error("index not found for field `{field}` (type {index_type})")]
    IndexNotFound { field: String, index_type: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid TTL: {0}")]
    InvalidTtl(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("value is not a mapping, cannot index field `{field}`")]
    NotAMapping { field: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
