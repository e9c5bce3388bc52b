use thiserror::Error;

/// Concrete errors produced while accumulating or reading a request body.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// a reader method (`read`, `read_stream`, or `drain`) was invoked on a
    /// body that had already been handed to a reader.
    #[error("the request body was already read")]
    AlreadyRead,

    /// the channel closed before the terminal chunk arrived.
    #[error("connection closed before the request body was fully received{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConnectionClosed {
        /// the channel's closure reason, if the transport provided one.
        reason: Option<String>,
    },

    /// the body exceeded [`BodyConfig::max_content_length`][crate::BodyConfig]. All
    /// chunk buffers held by the accumulator have already been released by
    /// the time this error is observed.
    #[error("request body of {observed} bytes exceeds the configured maximum of {ceiling} bytes")]
    TooLarge {
        /// the configured ceiling that was exceeded
        ceiling: u64,
        /// the length (advertised or received so far) that triggered the error
        observed: u64,
    },

    /// an io error occurred while pumping chunks from the underlying
    /// [`BodySource`][crate::BodySource].
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// this crate's result type
pub type Result<T> = std::result::Result<T, Error>;
