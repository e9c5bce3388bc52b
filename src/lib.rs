#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! The HTTP/1.1 request-body accumulator and reader.
//!
//! This crate owns every inbound chunk for a single request: it buffers or
//! streams the body to the application exactly once, enforces a configured
//! size ceiling, honors `Expect: 100-continue`, and guarantees that every
//! reference-counted chunk buffer is released on every path (success, early
//! close, oversize rejection, or cancellation).
//!
//! It is deliberately narrow. Request parsing and framing, response
//! writing, routing, TLS, and the surrounding executor are all external
//! collaborators; the only seam this crate defines toward them is
//! [`BodySource`], which a host server implements against its real
//! transport and parser.

mod accumulator;
mod chunk;
mod config;
mod drain;
mod error;
mod listener;
mod reader;
mod source;
mod state;
mod stream;

pub use accumulator::RequestBody;
pub use chunk::ChunkBuffer;
#[cfg(feature = "refcount-debug")]
pub use chunk::refcount;
pub use config::{BodyConfig, DEFAULT_CONFIG};
pub use error::{Error, Result};
pub use reader::{HandlerError, ReadOrElseError};
pub use source::BodySource;
pub use state::{DrainOutcome, State};
pub use stream::BodyStream;
