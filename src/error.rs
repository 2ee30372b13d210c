//! Unified error type.

use std::fmt;

/// The error type returned by body-writing procedures.
///
/// Application-level failures (404, 422, etc.) are expressed as
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// failures while producing a body: a broken sink or a serializer giving up
/// halfway through.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps any error (or message) that is not an I/O failure.
    ///
    /// ```rust
    /// let err = mantle::Error::other("template missing");
    /// assert_eq!(err.to_string(), "template missing");
    /// ```
    pub fn other(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(e.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Other(e) => Some(e.as_ref()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
