use std::fmt::{self, Display, Formatter};

/// The five-state lifecycle governing every operation's legality (spec §3).
///
/// `Read`, `Discarded`, and `TooLarge` are terminal and sticky: once
/// reached, chunks arriving afterward are released immediately and no
/// reader method succeeds again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// no reader has been installed yet.
    #[default]
    Unread,
    /// a reader is installed and pumping chunks.
    Reading,
    /// the body was fully read (or fully drained) exactly once.
    Read,
    /// the body was discarded, either by `drain()` after a prior error or
    /// by cancellation of the streaming reader.
    Discarded,
    /// the body exceeded its configured ceiling; all held chunks were
    /// released.
    TooLarge,
}

impl State {
    /// whether this state is one of the three terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Read | State::Discarded | State::TooLarge)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Unread => "unread",
            State::Reading => "reading",
            State::Read => "read",
            State::Discarded => "discarded",
            State::TooLarge => "too-large",
        })
    }
}

/// The result of [`RequestBody::drain`][crate::RequestBody::drain].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// the remaining body fit within the ceiling and was fully consumed (or
    /// never arrived); the connection is reusable.
    Drained,
    /// the remaining body would have breached the ceiling; the connection
    /// must be closed.
    TooLarge,
    /// a prior error had already forced the body into the `Discarded`
    /// state; `drain()` is idempotent on top of that.
    Discarded,
}
