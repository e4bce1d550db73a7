//! HTTP server module.
//!
//! The listener speaks plain HTTP only; terminate TLS in front of it if the
//! trigger crosses an untrusted network.
//!
//! The server includes:
//! - Peer address capture for request logs
//! - Graceful shutdown on SIGTERM/SIGINT

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
