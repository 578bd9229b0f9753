//! Common utilities for sqlweave
//!
//! This crate provides the error type shared by every sqlweave crate.

pub mod error;

pub use error::{SqlWeaveError, Result};
