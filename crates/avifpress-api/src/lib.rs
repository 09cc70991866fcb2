//! HTTP layer of the conversion engine.
//!
//! Thin handlers over the processing pipeline and service layer; everything
//! reusable lives in the other crates. Exposed as a library so integration
//! tests can assemble the router without binding a socket.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
