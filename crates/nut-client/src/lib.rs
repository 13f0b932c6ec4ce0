//! Session state machine for UPS network protocol clients.
//!
//! [`UpsClient`] is the common interface; [`TcpUpsClient`] drives it over
//! a real connection to a `upsd`-compatible server, and [`MemUpsClient`]
//! serves values out of memory for tests and embedders that don't want a
//! live server.

pub mod client_trait;
pub mod mem;
pub mod tcp;

pub use client_trait::UpsClient;
pub use mem::MemUpsClient;
pub use nut_proto::{Error, Result, TrackingId, TrackingResult};
pub use tcp::TcpUpsClient;
