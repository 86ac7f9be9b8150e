//! Integration test utilities for Dream X
//!
//! Each [`TestServer`] runs the full API in-process on an ephemeral port,
//! backed by its own SQLite file in a temporary directory.

pub mod helpers;
pub mod fixtures;

pub use helpers::*;
pub use fixtures::*;
