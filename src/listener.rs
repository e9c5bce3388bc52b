/// At most one reader may be installed at a time (spec invariant 4). This
/// tagged variant is the single dispatch point Design Notes §9 calls for:
/// [`RequestBody::dispatch_add`][crate::RequestBody::add] matches on it
/// instead of juggling nested closures, so the "exactly one reader
/// installed" invariant holds by construction rather than by convention.
///
/// Each reader method (`read`, `read_stream`, `drain`) owns `&mut RequestBody`
/// for the duration of its own pump loop, so delivery never crosses a task
/// boundary: the variant only records *which* per-chunk policy `add()`
/// should apply, not a channel to some other task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Listener {
    /// `read()`: every chunk is buffered; the reader composes them once the
    /// terminal chunk (or ceiling breach) ends the loop.
    OneShot,
    /// `read_stream()`: each non-empty chunk is handed back to the pump loop
    /// to forward to the subscriber immediately.
    Streaming,
    /// `drain()`: chunks are counted and released without being retained.
    Draining,
}
