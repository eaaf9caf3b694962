//! Line-delimited JSON relay between a host process and a Spindle worker.
//!
//! The host writes one `request` frame per line and reads back exactly one
//! `response` frame before sending the next. A `stop` frame, or closing the
//! stream, tells the worker that no more requests will follow.
//!
//! ```text
//! host → worker  {"kind":"request","method":"GET","uri":"/","headers":{},"body":""}
//! worker → host  {"kind":"response","status":200,"headers":{},"body":"..."}
//! host → worker  {"kind":"stop"}
//! ```

mod connect;
mod error;
mod frame;
mod reader;
mod relay;

pub use connect::{DynRelay, connect};
pub use error::RelayError;
pub use frame::{HostFrame, WireHeaders, WorkerFrame};
pub use reader::MAX_FRAME_BYTES;
pub use relay::Relay;

/// Tracing target for relay diagnostics.
pub(crate) const RELAY_TARGET: &str = "spindle::relay";
