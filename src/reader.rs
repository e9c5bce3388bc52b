//! the one-shot, buffered reader (spec §4.2).

use crate::{
    accumulator::{already_read_if_not_unread, AddOutcome},
    chunk::compose,
    listener::Listener,
    state::State,
    ChunkBuffer, Error, RequestBody, Result,
};
use std::io;

/// the error type of [`RequestBody::read_or_handle`]: either one of this
/// crate's own errors, or an error returned by the caller's too-large
/// handler, surfaced unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ReadOrElseError<E> {
    /// a body-accumulator error (already read, connection closed, io).
    #[error(transparent)]
    Body(#[from] Error),
    /// the caller's too-large handler itself failed. Propagated verbatim,
    /// matching the spec's "exceptions thrown by the action propagate
    /// unchanged" contract for the too-large action.
    #[error(transparent)]
    Handler(#[from] HandlerError<E>),
}

/// wraps a handler error so it gets its own `#[error(transparent)]` arm
/// without requiring `E: std::error::Error` to coincide with
/// [`Error`][crate::Error]'s bound in a single variant.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HandlerError<E>(#[from] pub E);

impl RequestBody {
    /// Reads the entire body into one composed buffer (spec §4.2).
    ///
    /// On a ceiling breach, this is equivalent to the spec's
    /// `DEFAULT_TOO_LARGE_SENTINEL`: the future fails with
    /// [`Error::TooLarge`] rather than invoking a handler.
    pub async fn read(&mut self) -> Result<ChunkBuffer> {
        match self.read_or_handle(|ceiling, observed| -> std::result::Result<(), Error> {
            Err(Error::TooLarge { ceiling, observed })
        }).await {
            Ok(Some(chunk)) => Ok(chunk),
            Ok(None) => unreachable!("the sentinel handler always errors"),
            Err(ReadOrElseError::Body(e)) => Err(e),
            Err(ReadOrElseError::Handler(HandlerError(e))) => Err(e),
        }
    }

    /// Reads the entire body, running `on_too_large` instead of failing
    /// outright when the ceiling is breached (spec §4.2's composition rule
    /// with a caller-supplied too-large action).
    ///
    /// Returns `Ok(Some(chunk))` on a normal read, `Ok(None)` when the
    /// ceiling was breached and `on_too_large` completed successfully (the
    /// spec's "complete the deferred without a value" outcome), or
    /// `Err(ReadOrElseError::Handler(_))` when `on_too_large` itself fails —
    /// propagated unchanged, never wrapped.
    pub async fn read_or_handle<F, E>(
        &mut self,
        on_too_large: F,
    ) -> std::result::Result<Option<ChunkBuffer>, ReadOrElseError<E>>
    where
        F: FnOnce(u64, u64) -> std::result::Result<(), E>,
    {
        already_read_if_not_unread(self.state)?;
        self.state = State::Reading;

        if let Some((ceiling, observed)) = self.oversize() {
            self.discard();
            self.state = State::TooLarge;
            return match on_too_large(ceiling, observed) {
                Ok(()) => Ok(None),
                Err(e) => Err(ReadOrElseError::Handler(HandlerError(e))),
            };
        }

        if self.received_last {
            return Ok(Some(self.compose_received()));
        }

        if let Some(reason) = self.early_close.take() {
            self.discard();
            let reason = (!reason.is_empty()).then_some(reason);
            return Err(Error::ConnectionClosed { reason }.into());
        }

        self.listener = Some(Listener::OneShot);

        if self.source.expects_continue() {
            self.source.write_continue().await.map_err(Error::Io)?;
        }

        loop {
            let read = self.source_mut().read_chunk().await;
            let outcome = match read {
                Ok(chunk) => self.dispatch_add(chunk),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.dispatch_close(None);
                    self.discard();
                    break Err(Error::ConnectionClosed { reason: None }.into());
                }
                Err(e) => {
                    self.discard();
                    break Err(Error::Io(e).into());
                }
            };

            match outcome {
                AddOutcome::Complete => break Ok(Some(self.compose_received())),
                AddOutcome::TooLarge { ceiling, observed } => {
                    break match on_too_large(ceiling, observed) {
                        Ok(()) => Ok(None),
                        Err(e) => Err(ReadOrElseError::Handler(HandlerError(e))),
                    }
                }
                AddOutcome::Buffered => continue,
                AddOutcome::Forward(_) | AddOutcome::CompleteWithItem(_) | AddOutcome::Continuing => {
                    unreachable!("a one-shot listener never produces this outcome")
                }
            }
        }
    }
}
