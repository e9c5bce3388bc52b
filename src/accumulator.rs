use crate::{
    chunk::compose,
    listener::Listener,
    source::BodySource,
    state::State,
    BodyConfig, ChunkBuffer, Error,
};

/// One request body, owned for the request's lifetime (spec §3).
///
/// `RequestBody` owns every inbound chunk for a single request: it enforces
/// the configured size ceiling, tracks `100-continue` expectations, and
/// exposes the body exactly once to the application through [`read`][Self::read],
/// [`read_stream`][Self::read_stream], or [`drain`][Self::drain].
///
/// The [`BodySource`] is the only collaborator this type depends on; it
/// stands in for the request parser, the transport, and the `100-continue`
/// write path, all of which are out of scope for this crate (see the crate
/// docs).
pub struct RequestBody {
    pub(crate) source: Box<dyn BodySource>,
    pub(crate) advertised_length: i64,
    pub(crate) max_content_length: i64,
    pub(crate) received_length: u64,
    pub(crate) received: Vec<ChunkBuffer>,
    pub(crate) received_last: bool,
    pub(crate) early_close: Option<String>,
    pub(crate) state: State,
    pub(crate) listener: Option<Listener>,
}

/// What calling [`RequestBody::add`] while a listener is installed, or while
/// none is, resolved to. Private to the crate: the reader implementations in
/// `reader.rs`, `stream.rs`, and `drain.rs` each interpret it according to
/// which of them installed the listener.
pub(crate) enum AddOutcome {
    /// no listener was installed; the chunk was buffered (or released, if
    /// empty and non-terminal).
    Buffered,
    /// a streaming listener is installed and this chunk should be emitted
    /// to the subscriber now; ownership transfers to the caller. More
    /// chunks may follow.
    Forward(ChunkBuffer),
    /// the installed reader's job is done: one-shot should compose
    /// `received` and succeed; streaming should end its signal; draining
    /// should report `Drained`.
    Complete,
    /// the terminal chunk for a streaming listener carried payload bytes:
    /// emit it to the subscriber, then end the signal. Distinct from
    /// `Forward` (more chunks may follow) and `Complete` (nothing left to
    /// emit).
    CompleteWithItem(ChunkBuffer),
    /// the ceiling was breached. `discard()` has already run.
    TooLarge { ceiling: u64, observed: u64 },
    /// a draining listener consumed this chunk; draining continues.
    Continuing,
}

/// What calling [`RequestBody::on_close`] resolved to.
pub(crate) enum CloseOutcome {
    /// `received_last` was already `true`; the close is moot.
    Ignored,
    /// no listener was installed; `early_close` has been recorded for the
    /// next reader to observe.
    Buffered,
    /// the installed reader should treat this as its terminal event: a
    /// one-shot or streaming reader fails with `ConnectionClosed`; a
    /// draining reader reports `Drained` (the spec's drain algorithm
    /// treats an early close as "the client never sent more, connection
    /// reusable").
    Complete,
}

impl RequestBody {
    /// Constructs a new accumulator for a request.
    ///
    /// `advertised_length` is the request's `Content-Length`, or `-1` if
    /// absent or the request uses chunked transfer-encoding, matching the
    /// sentinel convention [`RequestBody::get_content_length`] exposes.
    pub fn new(source: Box<dyn BodySource>, advertised_length: i64, config: BodyConfig) -> Self {
        Self {
            source,
            advertised_length,
            max_content_length: config.max_content_length,
            received_length: 0,
            received: Vec::new(),
            received_last: false,
            early_close: None,
            state: State::Unread,
            listener: None,
        }
    }

    /// the request's advertised content length, or `-1` if absent/chunked.
    pub fn get_content_length(&self) -> i64 {
        self.advertised_length
    }

    /// the configured ceiling, in bytes. Non-positive means unlimited.
    pub fn get_max_content_length(&self) -> i64 {
        self.max_content_length
    }

    /// overrides the configured ceiling for this body only.
    pub fn set_max_content_length(&mut self, max_content_length: i64) {
        self.max_content_length = max_content_length;
    }

    /// the current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// the number of readable bytes received (and held or streamed) so far.
    pub fn received_length(&self) -> u64 {
        self.received_length
    }

    pub(crate) fn exceeds(&self, len: i64) -> bool {
        self.max_content_length > 0 && len > 0 && len > self.max_content_length
    }

    /// `(ceiling, observed)` if either the advertised or the received length
    /// already breaches the configured ceiling, advertised-length first
    /// (spec §4.2 steps 3-4, reused by the streaming reader's subscription
    /// check in §4.3 and the drainer's fast-reject in §4.4).
    pub(crate) fn oversize(&self) -> Option<(u64, u64)> {
        if self.exceeds(self.advertised_length) {
            Some((self.max_content_length as u64, self.advertised_length as u64))
        } else if self.exceeds(self.received_length as i64) {
            Some((self.max_content_length as u64, self.received_length))
        } else {
            None
        }
    }

    /// Releases every chunk currently held in `received`. Used by the
    /// too-large path and by the drainer.
    pub(crate) fn release_held(&mut self) {
        self.received.clear();
    }

    /// Releases all held chunks and marks this body `Discarded`, unless it
    /// is already in a terminal state (in which case the terminal state is
    /// sticky and wins). The real [`BodySource`] is replaced by an inert
    /// stub, so anything it was still holding — chunks it had in hand but
    /// hadn't handed over yet — is dropped and released along with it,
    /// rather than lingering for the rest of this body's lifetime.
    pub(crate) fn discard(&mut self) {
        self.release_held();
        self.listener = None;
        self.source = Box::new(crate::source::DiscardedSource);
        if !self.state.is_terminal() {
            self.state = State::Discarded;
        }
    }

    fn too_large(&mut self, observed: i64) -> AddOutcome {
        log::warn!(
            "request body of {observed} bytes exceeds max_content_length of {}",
            self.max_content_length
        );
        self.release_held();
        self.listener = None;
        self.source = Box::new(crate::source::DiscardedSource);
        self.state = State::TooLarge;
        AddOutcome::TooLarge {
            ceiling: self.max_content_length as u64,
            observed: observed as u64,
        }
    }

    /// The accumulator's single dispatch point for inbound chunks (spec
    /// §4.1). Consumed from the parser/channel layer; also driven
    /// internally by this crate's own reader pump loops, which call it
    /// with every chunk they read from the [`BodySource`].
    pub fn add(&mut self, chunk: ChunkBuffer) {
        let _ = self.dispatch_add(chunk);
    }

    pub(crate) fn dispatch_add(&mut self, chunk: ChunkBuffer) -> AddOutcome {
        if matches!(self.state, State::Read | State::TooLarge | State::Discarded) {
            log::trace!(
                "dropping chunk of {} bytes arriving in terminal state {}",
                chunk.readable_bytes(),
                self.state
            );
            drop(chunk);
            return AddOutcome::Buffered;
        }

        if chunk.is_last() {
            self.received_last = true;
        }

        let Some(listener) = self.listener.take() else {
            if chunk.readable_bytes() > 0 {
                self.received_length += chunk.readable_bytes() as u64;
                self.received.push(chunk);
            } else {
                drop(chunk);
            }
            return AddOutcome::Buffered;
        };

        match listener {
            Listener::OneShot => {
                if chunk.readable_bytes() > 0 {
                    self.received_length += chunk.readable_bytes() as u64;
                    if self.exceeds(self.received_length as i64) {
                        return self.too_large(self.received_length as i64);
                    }
                    self.received.push(chunk);
                }
                if self.received_last {
                    AddOutcome::Complete
                } else {
                    self.listener = Some(Listener::OneShot);
                    AddOutcome::Buffered
                }
            }

            Listener::Streaming => {
                if chunk.readable_bytes() > 0 {
                    self.received_length += chunk.readable_bytes() as u64;
                    if self.exceeds(self.received_length as i64) {
                        return self.too_large(self.received_length as i64);
                    }
                }
                let is_last = chunk.is_last();
                let has_bytes = chunk.readable_bytes() > 0;
                if is_last {
                    self.state = State::Read;
                    if has_bytes {
                        AddOutcome::CompleteWithItem(chunk)
                    } else {
                        drop(chunk);
                        AddOutcome::Complete
                    }
                } else {
                    self.listener = Some(Listener::Streaming);
                    if has_bytes {
                        AddOutcome::Forward(chunk)
                    } else {
                        drop(chunk);
                        AddOutcome::Buffered
                    }
                }
            }

            Listener::Draining => {
                let bytes = chunk.readable_bytes() as u64;
                let is_last = chunk.is_last();
                drop(chunk);
                self.received_length += bytes;
                if self.exceeds(self.received_length as i64) {
                    return self.too_large(self.received_length as i64);
                }
                if is_last {
                    self.state = State::Read;
                    AddOutcome::Complete
                } else {
                    self.listener = Some(Listener::Draining);
                    AddOutcome::Continuing
                }
            }
        }
    }

    /// Called when the channel closes, from either peer. Consumed from the
    /// parser/channel layer, and driven internally whenever a reader's pump
    /// observes the underlying [`BodySource`] report
    /// [`io::ErrorKind::UnexpectedEof`][std::io::ErrorKind::UnexpectedEof].
    pub fn on_close(&mut self) {
        let _ = self.dispatch_close(None);
    }

    pub(crate) fn dispatch_close(&mut self, reason: Option<String>) -> CloseOutcome {
        if self.received_last {
            return CloseOutcome::Ignored;
        }

        match self.listener.take() {
            None => {
                self.early_close = Some(reason.unwrap_or_default());
                CloseOutcome::Buffered
            }
            Some(Listener::Draining) => {
                self.state = State::Read;
                CloseOutcome::Complete
            }
            Some(_) => {
                self.early_close = Some(reason.unwrap_or_default());
                CloseOutcome::Complete
            }
        }
    }

    /// Composes the currently held chunks per the one-shot composition rule
    /// (spec §4.2): empty yields an empty buffer, a single chunk is a
    /// zero-copy view, more than one is concatenated into a fresh buffer
    /// that owns the release of its sources.
    pub(crate) fn compose_received(&mut self) -> ChunkBuffer {
        compose(std::mem::take(&mut self.received), true)
    }

    pub(crate) fn source_mut(&mut self) -> &mut dyn BodySource {
        self.source.as_mut()
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBody")
            .field("advertised_length", &self.advertised_length)
            .field("max_content_length", &self.max_content_length)
            .field("received_length", &self.received_length)
            .field("received_last", &self.received_last)
            .field("state", &self.state)
            .finish()
    }
}

pub(crate) fn already_read_if_not_unread(state: State) -> crate::Result<()> {
    if state == State::Unread {
        Ok(())
    } else {
        Err(Error::AlreadyRead)
    }
}
