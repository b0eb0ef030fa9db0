//! Error handling
//!
//! Defines error types for the lifecycle core.

pub mod types;

pub use types::*;
