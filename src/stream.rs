//! the streaming, back-pressured reader (spec §4.3).

use crate::{
    accumulator::{already_read_if_not_unread, AddOutcome},
    chunk::compose,
    listener::Listener,
    state::State,
    ChunkBuffer, Error, RequestBody, Result,
};
use futures_lite::{stream, Stream};
use std::{
    fmt::{self, Debug, Formatter},
    io,
    pin::Pin,
    task::{Context, Poll},
};

#[derive(Debug, Clone, Copy)]
enum Phase {
    Start,
    Pumping,
    Done,
}

/// Guards the body for the lifetime of a [`BodyStream`]: if the stream is
/// dropped before reaching a terminal state — the subscriber cancelling
/// (spec §5, "Cancelling the streaming publisher puts the accumulator into
/// `DISCARDED`") — this releases any chunk still held and leaves the body
/// `Discarded` instead of stuck in `Reading`.
struct DiscardGuard<'a> {
    body: &'a mut RequestBody,
}

impl Drop for DiscardGuard<'_> {
    fn drop(&mut self) {
        if !self.body.state().is_terminal() {
            self.body.discard();
        }
    }
}

/// The stream returned by [`RequestBody::read_stream`].
///
/// Every poll is one unit of subscriber demand: the pump never issues a
/// second [`BodySource::read_chunk`][crate::BodySource::read_chunk] until the
/// chunk it already has is yielded downstream, so this never buffers more
/// than one additional chunk ahead of demand. Dropping the stream before it
/// completes cancels the read — any chunk still held is released and the
/// body is left [`State::Discarded`].
pub struct BodyStream<'a> {
    inner: Pin<Box<dyn Stream<Item = Result<ChunkBuffer>> + 'a>>,
}

impl Stream for BodyStream<'_> {
    type Item = Result<ChunkBuffer>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Debug for BodyStream<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream").finish_non_exhaustive()
    }
}

impl RequestBody {
    /// Streams the body as a sequence of chunks with explicit back-pressure
    /// (spec §4.3). See [`BodyStream`] for the cancellation contract.
    pub fn read_stream(&mut self) -> BodyStream<'_> {
        let guard = DiscardGuard { body: self };
        let inner = stream::unfold((guard, Phase::Start), |(mut guard, phase)| async move {
            let (item, next_phase) = step(&mut *guard.body, phase).await?;
            Some((item, (guard, next_phase)))
        });
        BodyStream {
            inner: Box::pin(inner),
        }
    }
}

async fn step(body: &mut RequestBody, phase: Phase) -> Option<(Result<ChunkBuffer>, Phase)> {
    match phase {
        Phase::Done => None,
        Phase::Start => start(body).await,
        Phase::Pumping => pump(body).await,
    }
}

async fn start(body: &mut RequestBody) -> Option<(Result<ChunkBuffer>, Phase)> {
    if let Err(e) = already_read_if_not_unread(body.state) {
        return Some((Err(e), Phase::Done));
    }
    body.state = State::Reading;

    if let Some((ceiling, observed)) = body.oversize() {
        body.discard();
        body.state = State::TooLarge;
        return Some((Err(Error::TooLarge { ceiling, observed }), Phase::Done));
    }

    if !body.received.is_empty() {
        let received_last = body.received_last;
        let buffered = compose(std::mem::take(&mut body.received), received_last);
        return if received_last {
            body.state = State::Read;
            Some((Ok(buffered), Phase::Done))
        } else {
            body.listener = Some(Listener::Streaming);
            Some((Ok(buffered), Phase::Pumping))
        };
    }

    if body.received_last {
        body.state = State::Read;
        return None;
    }

    if let Some(reason) = body.early_close.take() {
        body.discard();
        let reason = (!reason.is_empty()).then_some(reason);
        return Some((Err(Error::ConnectionClosed { reason }), Phase::Done));
    }

    body.listener = Some(Listener::Streaming);

    if body.source.expects_continue() {
        if let Err(e) = body.source.write_continue().await {
            body.discard();
            return Some((Err(Error::Io(e)), Phase::Done));
        }
    }

    pump(body).await
}

async fn pump(body: &mut RequestBody) -> Option<(Result<ChunkBuffer>, Phase)> {
    loop {
        match body.source_mut().read_chunk().await {
            Ok(chunk) => match body.dispatch_add(chunk) {
                AddOutcome::Forward(chunk) => return Some((Ok(chunk), Phase::Pumping)),
                AddOutcome::CompleteWithItem(chunk) => return Some((Ok(chunk), Phase::Done)),
                AddOutcome::Complete => return None,
                AddOutcome::TooLarge { ceiling, observed } => {
                    return Some((Err(Error::TooLarge { ceiling, observed }), Phase::Done))
                }
                AddOutcome::Buffered => continue,
                AddOutcome::Continuing => {
                    unreachable!("a streaming listener never produces this outcome")
                }
            },
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                body.dispatch_close(None);
                return Some((Err(Error::ConnectionClosed { reason: None }), Phase::Done));
            }
            Err(e) => {
                body.discard();
                return Some((Err(Error::Io(e)), Phase::Done));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BodyConfig, source::mock::MockSource};
    use futures_lite::{future::block_on, StreamExt};

    fn body(source: MockSource, advertised_length: i64, config: BodyConfig) -> RequestBody {
        RequestBody::new(Box::new(source), advertised_length, config)
    }

    #[test]
    fn single_terminal_chunk_emits_one_item() {
        let mut source = MockSource::new(false);
        source.push_chunk(ChunkBuffer::new(&b"0123456789012345678901234567890123456789012345678901234567890123456789"[..][..30], true));
        let mut b = body(source, 30, BodyConfig::default());
        let items: Vec<_> = block_on(b.read_stream().collect());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().readable_bytes(), 30);
        assert_eq!(b.state(), State::Read);
    }

    #[test]
    fn multiple_chunks_are_forwarded_individually() {
        let mut source = MockSource::new(false);
        source
            .push_chunk(ChunkBuffer::new(&b"abc"[..], false))
            .push_chunk(ChunkBuffer::new(&b"def"[..], true));
        let mut b = body(source, 6, BodyConfig::default());
        let items: Vec<_> = block_on(b.read_stream().collect());
        let bytes: Vec<_> = items
            .into_iter()
            .map(|c| c.unwrap().as_slice().to_vec())
            .collect();
        assert_eq!(bytes, vec![b"abc".to_vec(), b"def".to_vec()]);
        assert_eq!(b.state(), State::Read);
    }

    #[test]
    fn second_subscription_fails_already_read() {
        let mut source = MockSource::new(false);
        source.push_chunk(ChunkBuffer::new(&b"x"[..], true));
        let mut b = body(source, 1, BodyConfig::default());
        let _: Vec<_> = block_on(b.read_stream().collect());
        let items: Vec<_> = block_on(b.read_stream().collect());
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::AlreadyRead)));
    }

    #[test]
    fn oversize_advertised_length_errors_before_any_read() {
        let mut source = MockSource::new(false);
        source.push_chunk(ChunkBuffer::new(&b"ignored"[..], true));
        let mut b = body(
            source,
            200,
            BodyConfig::default().with_max_content_length(100),
        );
        let items: Vec<_> = block_on(b.read_stream().collect());
        assert_eq!(items.len(), 1);
        assert!(matches!(
            items[0],
            Err(Error::TooLarge {
                ceiling: 100,
                observed: 200
            })
        ));
        assert_eq!(b.state(), State::TooLarge);
    }

    #[test]
    fn oversize_mid_stream_releases_and_errors() {
        let mut source = MockSource::new(false);
        source
            .push_chunk(ChunkBuffer::new(vec![0u8; 60], false))
            .push_chunk(ChunkBuffer::new(vec![0u8; 60], true));
        let mut b = body(
            source,
            -1,
            BodyConfig::default().with_max_content_length(100),
        );
        let items: Vec<_> = block_on(b.read_stream().collect());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().readable_bytes(), 60);
        assert!(matches!(
            items[1],
            Err(Error::TooLarge {
                ceiling: 100,
                observed: 120
            })
        ));
        assert_eq!(b.state(), State::TooLarge);
    }

    #[test]
    fn early_close_before_any_chunk_errors_connection_closed() {
        let mut source = MockSource::new(false);
        source.push_close();
        let mut b = body(source, -1, BodyConfig::default());
        let items: Vec<_> = block_on(b.read_stream().collect());
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::ConnectionClosed { .. })));
    }

    #[test]
    fn dropping_the_stream_early_discards() {
        let mut source = MockSource::new(false);
        source
            .push_chunk(ChunkBuffer::new(&b"abc"[..], false))
            .push_chunk(ChunkBuffer::new(&b"def"[..], true));
        let mut b = body(source, 6, BodyConfig::default());
        {
            let mut s = b.read_stream();
            let _ = block_on(s.next());
        }
        assert_eq!(b.state(), State::Discarded);
    }
}
