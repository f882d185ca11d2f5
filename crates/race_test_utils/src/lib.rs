//! # Race Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture boards and configurations
//! - Board invariant checks
//! - Determinism harness for single-threaded tick sequences
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
