//! Sparktag Tag - Process variables with report-by-exception semantics
//!
//! This crate implements the tag entity:
//! - Host bindings (typed, non-owning accessors into host memory)
//! - Change detection (default policy, deadband, custom comparators)
//! - Read dispatch with one-deep history and on-change callbacks
//! - Write dispatch with writability flags and validation callbacks

pub mod detect;
pub mod engine;
pub mod host;
pub mod tag;

pub use detect::*;
pub use host::*;
pub use tag::*;
