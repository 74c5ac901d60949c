//! Sparktag Test Harness - Simulation and end-to-end validation
//!
//! This crate provides:
//! - A seeded host simulator that mutates process variables between bulk reads
//! - Change detection and publish-signal invariant checking
//! - A prebuilt plant fixture covering every tag kind
//! - Tracing setup for tests and benches

pub mod logging;
pub mod scenario;
pub mod simulator;

pub use logging::*;
pub use scenario::*;
pub use simulator::*;
