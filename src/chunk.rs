use bytes::{Bytes, BytesMut};
use std::fmt::{self, Debug, Formatter};

/// A single zero-copy view into a received body chunk.
///
/// `ChunkBuffer` wraps a [`bytes::Bytes`], which is itself a reference-counted
/// handle into pooled memory: cloning is an atomic refcount bump, never a
/// copy, and the underlying storage is released exactly when the last handle
/// is dropped. That gives us the "every reference-counted byte buffer is
/// released on every path" guarantee from the accumulator's purpose
/// statement for free, by construction, rather than as a bookkeeping
/// obligation every call site has to discharge correctly.
///
/// The terminal chunk for a request may carry zero bytes; `is_last` is what
/// distinguishes "no more data" from "empty chunk".
#[derive(Clone)]
pub struct ChunkBuffer {
    bytes: Bytes,
    is_last: bool,
    #[cfg(feature = "refcount-debug")]
    _guard: refcount::Guard,
}

impl ChunkBuffer {
    /// constructs a new chunk from any type that converts into [`Bytes`].
    pub fn new(bytes: impl Into<Bytes>, is_last: bool) -> Self {
        Self {
            bytes: bytes.into(),
            is_last,
            #[cfg(feature = "refcount-debug")]
            _guard: refcount::Guard::created(),
        }
    }

    /// an empty terminal chunk, as delivered when a body ends with a
    /// zero-byte final chunk.
    pub fn empty_last() -> Self {
        Self::new(Bytes::new(), true)
    }

    /// the number of readable bytes in this chunk.
    pub fn readable_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// whether this chunk carries any payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// whether this is the terminal chunk for the request.
    pub fn is_last(&self) -> bool {
        self.is_last
    }

    /// borrow the chunk's bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// consume this handle and return the underlying [`Bytes`].
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

impl Debug for ChunkBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkBuffer")
            .field("readable_bytes", &self.bytes.len())
            .field("is_last", &self.is_last)
            .finish()
    }
}

/// Composes an ordered list of chunks per the one-shot reader's composition
/// rule (spec §4.2): empty list yields an empty buffer, a single element is
/// returned as a zero-copy view with no further allocation, and two or more
/// elements are concatenated into one new buffer that owns the release of
/// its sources.
pub(crate) fn compose(mut chunks: Vec<ChunkBuffer>, is_last: bool) -> ChunkBuffer {
    match chunks.len() {
        0 => ChunkBuffer::new(Bytes::new(), is_last),
        1 => {
            let mut chunk = chunks.pop().unwrap();
            chunk.is_last = is_last;
            chunk
        }
        _ => {
            let total: usize = chunks.iter().map(ChunkBuffer::readable_bytes).sum();
            let mut composed = BytesMut::with_capacity(total);
            for chunk in chunks {
                composed.extend_from_slice(chunk.as_slice());
                // `chunk` is dropped here: its refcount guard fires, marking
                // it released now that its bytes have been copied forward.
            }
            ChunkBuffer::new(composed.freeze(), is_last)
        }
    }
}

#[cfg(feature = "refcount-debug")]
pub mod refcount {
    //! debug-only bookkeeping for [`ChunkBuffer`] creation and release,
    //! gated behind the `refcount-debug` feature per the accumulator
    //! spec's Design Notes (§9). Exists purely so tests can assert
    //! invariant 1 ("every chunk reference created is eventually released
    //! or transferred") without relying on a GC the host language doesn't
    //! have.
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CREATED: AtomicUsize = AtomicUsize::new(0);
    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    pub(crate) struct Guard;

    impl Guard {
        pub(crate) fn created() -> Self {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Self
        }
    }

    impl Clone for Guard {
        fn clone(&self) -> Self {
            Guard::created()
        }
    }

    impl Drop for Guard {
        fn drop(&mut self) {
            RELEASED.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// total number of [`ChunkBuffer`]s constructed since the last [`reset`].
    pub fn created() -> usize {
        CREATED.load(Ordering::SeqCst)
    }

    /// total number of [`ChunkBuffer`]s dropped since the last [`reset`].
    pub fn released() -> usize {
        RELEASED.load(Ordering::SeqCst)
    }

    /// resets both counters. Intended for test setup only.
    pub fn reset() {
        CREATED.store(0, Ordering::SeqCst);
        RELEASED.store(0, Ordering::SeqCst);
    }
}
