use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while indexing or streaming a WebM container.
///
/// Payloads are plain strings so a failed build can be cached and handed to
/// every later caller of the same container.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A scalar payload is longer (or shorter) than its type allows.
    #[error("Size error: {0}")]
    SizeError(String),

    /// Malformed element stream: unexpected element type, second header,
    /// invalid variable-length integer.
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Range error: invalid byte range {start}-{end}")]
    RangeError { start: u64, end: u64 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("No cue points in manifest")]
    NoCuesError,

    /// The element stream ended before `Cues` or `Segment` closed.
    #[error("Incomplete manifest: {0}")]
    IncompleteError(String),
}

impl Error {
    pub fn size(msg: impl Into<String>) -> Self {
        Self::SizeError(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Failures that belong to the container itself rather than to the
    /// transport. A session keeps these forever.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Error::SizeError(_) | Error::ParseError(_) | Error::IncompleteError(_)
        )
    }
}
