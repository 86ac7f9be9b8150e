//! # dreamx-gateway
//!
//! WebSocket gateway for realtime delivery.
//!
//! Clients connect to `/gateway`, receive `HELLO`, authenticate with
//! `IDENTIFY` and then get every event published to their user room as a
//! `DISPATCH`. The gateway can be mounted into the API process with
//! [`gateway_router`] or run on its own with [`run`].

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use connection::{Connection, ConnectionManager, ConnectionRegistry, ConnectionState};
pub use server::{create_gateway_state, gateway_router, run, GatewayState};
