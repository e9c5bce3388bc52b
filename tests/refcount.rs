//! Exercises testable property 1 ("every chunk reference created via `add`
//! is eventually released or transferred") using the debug-only
//! create/release counters gated behind the `refcount-debug` feature.
//!
//! Run with `cargo test --features refcount-debug --test refcount`.

#![cfg(feature = "refcount-debug")]

use futures_lite::future::block_on;
use request_body_core::{refcount, BodyConfig, BodySource, ChunkBuffer, RequestBody};
use std::{
    collections::VecDeque,
    future::Future,
    io,
    pin::Pin,
};

#[derive(Debug, Clone)]
enum Event {
    Chunk(ChunkBuffer),
    Close,
}

#[derive(Default)]
struct MockSource {
    events: VecDeque<Event>,
}

impl MockSource {
    fn push(mut self, chunk: ChunkBuffer) -> Self {
        self.events.push_back(Event::Chunk(chunk));
        self
    }

    fn push_close(mut self) -> Self {
        self.events.push_back(Event::Close);
        self
    }
}

impl BodySource for MockSource {
    fn read_chunk(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ChunkBuffer>> + Send + '_>> {
        let next = self.events.pop_front();
        Box::pin(async move {
            match next {
                Some(Event::Chunk(chunk)) => Ok(chunk),
                Some(Event::Close) | None => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            }
        })
    }

    fn write_continue(&mut self) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn fire_expectation_failed(&mut self) {}

    fn expects_continue(&self) -> bool {
        false
    }
}

fn chunk(bytes: &[u8], is_last: bool) -> ChunkBuffer {
    ChunkBuffer::new(bytes.to_vec(), is_last)
}

/// a fully-buffered read composes all held chunks into one new buffer; the
/// sources are dropped (released) as soon as they're copied forward, and
/// the composed buffer itself is released when it goes out of scope at the
/// end of the test.
#[test]
fn read_releases_every_chunk_exactly_once() {
    refcount::reset();
    let source = MockSource::default()
        .push(chunk(&[0; 20], false))
        .push(chunk(&[0; 20], false))
        .push(chunk(&[0; 10], true));
    let mut body = RequestBody::new(Box::new(source), 50, BodyConfig::default());
    let created_before = refcount::created();
    {
        let composed = block_on(body.read()).unwrap();
        assert_eq!(composed.readable_bytes(), 50);
    }
    assert_eq!(refcount::created(), created_before);
    assert_eq!(refcount::created(), refcount::released());
}

/// a too-large rejection discards every held chunk; none leak.
#[test]
fn too_large_releases_every_held_chunk() {
    refcount::reset();
    let source = MockSource::default()
        .push(chunk(&[0; 60], false))
        .push(chunk(&[0; 60], true));
    let mut body = RequestBody::new(
        Box::new(source),
        -1,
        BodyConfig::default().with_max_content_length(100),
    );
    let _ = block_on(body.read());
    assert_eq!(refcount::created(), refcount::released());
}

/// a streaming read transfers ownership of each chunk to the caller, who
/// is responsible for dropping it; the accumulator itself never double
/// releases a chunk it has already forwarded.
#[test]
fn streamed_chunks_are_released_by_the_subscriber_not_twice() {
    use futures_lite::StreamExt;

    refcount::reset();
    let source = MockSource::default()
        .push(chunk(&[0; 5], false))
        .push(chunk(&[0; 5], true));
    let mut body = RequestBody::new(Box::new(source), 10, BodyConfig::default());
    {
        let items: Vec<_> = block_on(body.read_stream().collect());
        assert_eq!(items.len(), 2);
    }
    assert_eq!(refcount::created(), refcount::released());
}

/// draining releases every chunk it reads without retaining any.
#[test]
fn drain_releases_every_chunk() {
    refcount::reset();
    let source = MockSource::default()
        .push(chunk(&[0; 5], false))
        .push(chunk(&[0; 5], true));
    let mut body = RequestBody::new(Box::new(source), 10, BodyConfig::default());
    let _ = block_on(body.drain());
    assert_eq!(refcount::created(), refcount::released());
}

/// cancelling a streaming read (dropping the stream before the terminal
/// chunk) discards the body and releases anything still buffered.
#[test]
fn cancelling_the_stream_releases_buffered_chunks() {
    refcount::reset();
    let source = MockSource::default()
        .push(chunk(&[0; 5], false))
        .push(chunk(&[0; 5], true))
        .push_close();
    let mut body = RequestBody::new(Box::new(source), 10, BodyConfig::default());
    {
        let mut s = body.read_stream();
        let _ = block_on(futures_lite::StreamExt::next(&mut s));
    }
    assert_eq!(refcount::created(), refcount::released());
}
