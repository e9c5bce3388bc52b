use crate::ChunkBuffer;
use std::{
    future::Future,
    io,
    pin::Pin,
};

/// The parser/channel collaborator this crate consumes (spec §6,
/// "Consumed from the parser/channel layer").
///
/// Request parsing and framing, TLS, and the transport itself are explicitly
/// out of scope for this crate (spec §1); `BodySource` is the seam a host
/// server implements against its real connection to supply already-framed
/// chunk events. A chunk's bytes are never reparsed or re-decoded here.
///
/// `read_chunk` returning an [`io::Error`] of kind [`io::ErrorKind::UnexpectedEof`]
/// is how the source reports that the channel closed before a terminal
/// chunk arrived; any other error kind is surfaced to the active reader
/// as-is after `discard()` has run.
pub trait BodySource: Send {
    /// requests one more chunk from the transport. Corresponds to
    /// `channel.read()`.
    fn read_chunk(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ChunkBuffer>> + Send + '_>>;

    /// writes the `100 Continue` preface. Corresponds to
    /// `channel.write(continue_response)`.
    fn write_continue(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>>;

    /// fires an `ExpectationFailed` event so downstream can refuse the body.
    /// Corresponds to `channel.fire_user_event(ExpectationFailed)`. Called
    /// only by `drain()`, and only when a continue was expected but the
    /// body was never read.
    fn fire_expectation_failed(&mut self);

    /// whether the request carries `Expect: 100-continue`. Corresponds to
    /// `request.expects_continue()`.
    fn expects_continue(&self) -> bool;
}

/// Installed by [`RequestBody::discard`][crate::RequestBody::discard] in
/// place of the real source, so the real one — and anything it is still
/// holding (chunks it already has in hand but hasn't handed over yet) — is
/// dropped and released immediately rather than lingering for the lifetime
/// of a body that will never read from it again.
pub(crate) struct DiscardedSource;

impl BodySource for DiscardedSource {
    fn read_chunk(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ChunkBuffer>> + Send + '_>> {
        Box::pin(async { Err(io::Error::from(io::ErrorKind::UnexpectedEof)) })
    }

    fn write_continue(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn fire_expectation_failed(&mut self) {}

    fn expects_continue(&self) -> bool {
        false
    }
}
