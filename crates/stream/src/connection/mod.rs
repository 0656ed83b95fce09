//! The stream adapter sitting on one HTTP/1.1 connection.
//!
//! [`StreamAdapter`] drives the connection; the application talks to it
//! through the [`Exchange`] returned alongside it. Internally the adapter is
//! split along the protocol concerns it owns, all working on one
//! per-connection state record:
//!
//! - the inbound assembler turns request heads into full or streamed requests
//! - the outbound sequencer writes one response at a time, in order
//! - the continue controller emits `100 Continue` when it is owed and safe
//! - the keep-alive decision rewrites heads and closes after the response
//! - the upgrade coordinator hands the connection to a frame pump

mod adapter;
mod assembler;
mod config;
mod continue_expect;
mod exchange;
mod keep_alive;
mod state;
mod upgrade;

pub use adapter::StreamAdapter;
pub use config::AdapterConfig;
pub use exchange::{Exchange, Responder};
