//! Shared type definitions for Trellis
//!
//! This crate provides the small closed enumerations every other Trellis
//! crate dispatches on:
//!
//! - [`Backend`] - Storage backend tag (row-oriented SQL store, document store)
//! - [`LockLevel`] - Read lock strength for read-then-write sequences
//!
//! # Features
//!
//! - `std` - Standard library support (enabled by default)
//! - `serde` - Enable serde serialization/deserialization

#![cfg_attr(not(feature = "std"), no_std)]

mod backend;
mod lock;

pub use backend::{Backend, BackendParseError};
pub use lock::LockLevel;

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::{Backend, LockLevel};
}
