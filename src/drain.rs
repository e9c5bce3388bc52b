//! the drainer (spec §4.4).

use crate::{accumulator::AddOutcome, listener::Listener, state::State, DrainOutcome, RequestBody};
use std::io;

impl RequestBody {
    /// Discards any unread body so the connection can be reused or closed
    /// cleanly (spec §4.4).
    ///
    /// Unlike [`read`][Self::read] and [`read_stream`][Self::read_stream],
    /// `drain()` never fails: a transport error while pumping the
    /// underlying [`BodySource`][crate::BodySource] collapses to
    /// [`DrainOutcome::TooLarge`]'s sibling outcomes rather than
    /// propagating, because its whole purpose is to decide whether the
    /// connection is reusable, not to surface the body to a handler.
    pub async fn drain(&mut self) -> DrainOutcome {
        self.release_held();

        match self.state {
            State::Read => return DrainOutcome::Drained,
            State::TooLarge => return DrainOutcome::TooLarge,
            State::Discarded => return DrainOutcome::Discarded,
            State::Unread | State::Reading => {}
        }

        self.state = State::Reading;

        if self.received_last || self.source.expects_continue() {
            if self.source.expects_continue() {
                log::debug!("draining a body that was never read; refusing the continue");
                self.source.fire_expectation_failed();
            }
            self.release_held();
            self.state = State::Read;
            return DrainOutcome::Drained;
        }

        if let Some((ceiling, observed)) = self.oversize() {
            log::warn!(
                "drain: body of {observed} bytes already exceeds max_content_length of {ceiling}"
            );
            self.discard();
            self.state = State::TooLarge;
            return DrainOutcome::TooLarge;
        }

        self.listener = Some(Listener::Draining);

        loop {
            match self.source_mut().read_chunk().await {
                Ok(chunk) => match self.dispatch_add(chunk) {
                    AddOutcome::Complete => return DrainOutcome::Drained,
                    AddOutcome::TooLarge { .. } => return DrainOutcome::TooLarge,
                    AddOutcome::Continuing | AddOutcome::Buffered => continue,
                    AddOutcome::Forward(_) | AddOutcome::CompleteWithItem(_) => {
                        unreachable!("a draining listener never produces this outcome")
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.dispatch_close(None);
                    self.state = State::Read;
                    return DrainOutcome::Drained;
                }
                Err(e) => {
                    log::warn!("io error while draining request body: {e}");
                    self.discard();
                    self.state = State::TooLarge;
                    return DrainOutcome::TooLarge;
                }
            }
        }
    }
}
