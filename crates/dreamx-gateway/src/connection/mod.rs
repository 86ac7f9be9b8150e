//! Connection tracking
//!
//! [`Connection`] is one socket; [`ConnectionRegistry`] maps rooms to the
//! connections inside them.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState, Outbound};
pub use manager::{ConnectionManager, ConnectionRegistry};
