//! # Formats Module
//!
//! Byte-level encodings. File and database I/O live elsewhere.

mod persistence;

pub use persistence::*;
