//! Error types for tag operations

use thiserror::Error;

use crate::{DataType, TagId};

/// Core tag errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    // Buffer lifecycle errors
    #[error("Buffer allocation failed: {requested} bytes")]
    AllocationFailed { requested: usize },

    #[error("Buffer already allocated")]
    AlreadyAllocated,

    #[error("Buffer not allocated")]
    NotAllocated,

    #[error("Buffer has zero capacity")]
    ZeroCapacity,

    // Datatype errors
    #[error("Unknown datatype code: {0}")]
    UnknownDataType(u32),

    #[error("Reserved datatype code: {0}")]
    ReservedDataType(u32),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: DataType },

    // Write errors
    #[error("Tag has no host binding")]
    HostUnbound,

    #[error("Tag is not writable")]
    NotWritable,

    #[error("Write rejected by validation")]
    WriteRejected,

    #[error("Null value cannot be written to a scalar tag")]
    NullScalar,

    // Registry errors
    #[error("Tag not found: {0:?}")]
    UnknownTag(TagId),
}

/// Result type for tag operations
pub type TagResult<T> = Result<T, TagError>;
