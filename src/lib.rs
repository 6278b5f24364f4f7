//! `limitbook` — a single-instrument limit-order matching engine exposed
//! over a framed binary wire protocol, reachable through an asynchronous,
//! ring-buffered duplex socket transport.
//!
//! Start at [`prelude`] for the common types, or go straight to
//! [`engine::Exchange`] for in-process matching and [`client::Client`] /
//! [`server::Server`] for the networked client/server pair.

pub mod bits;
pub mod circular;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod nsemaphore;
pub mod order;
pub mod orderbook;
pub mod packet;
pub mod prelude;
pub mod server;
pub mod socket;
pub mod stats;
