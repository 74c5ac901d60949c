//! Sparktag Registry - The collection of live tags
//!
//! This crate implements the registry a driver loop works against:
//! - Tag creation and teardown (buffer allocation, alias uniqueness)
//! - Stable, creation-ordered indexed enumeration for encoders
//! - Lookup by name, alias, index or arbitrary predicate
//! - Bulk read with an aggregate "anything to publish" signal
//! - Injected timestamp source

pub mod clock;
pub mod config;
pub mod registry;

pub use clock::*;
pub use config::*;
pub use registry::*;
