//! Sparktag Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by the tag and registry crates:
//! - Datatype codes (stable wire numbering)
//! - Identifiers (TagId, Alias)
//! - Timestamps with the "never observed" sentinel
//! - Owned, capacity-bounded string and byte buffers
//! - Tagged values and timestamped snapshots

pub mod buffer;
pub mod datatype;
pub mod error;
pub mod id;
pub mod time;
pub mod value;

pub use buffer::*;
pub use datatype::*;
pub use error::*;
pub use id::*;
pub use time::*;
pub use value::*;
