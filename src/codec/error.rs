//! Error types for the frame codec.
//!
//! Decoding failures fall into two families:
//!
//! - [`FramingError`]: the length prefix itself is unacceptable (for example it
//!   announces a payload above the configured maximum).
//! - [`EofError`]: the peer closed the stream, either cleanly between frames or
//!   part-way through a header or payload.
//!
//! [`CodecError`] wraps both plus transport I/O failures. `tokio_util` codecs
//! must report `io::Error`, so the codec converts a [`CodecError`] into an
//! `io::Error` on the way out and [`CodecError::from_io`] recovers the
//! structured variant on the way back in.

use std::io;

use thiserror::Error;

/// Problems with the wire-level frame structure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The length prefix announces more bytes than the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Payload size announced by the length prefix.
        size: usize,
        /// Maximum payload size accepted.
        max: usize,
    },
}

/// End-of-stream conditions seen while reading frames.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EofError {
    /// The peer closed between frames. Nothing was lost.
    #[error("connection closed cleanly at frame boundary")]
    CleanClose,

    /// The peer closed after the header but before the full payload arrived.
    #[error("premature EOF: {bytes_received} bytes of {expected} byte frame received")]
    MidFrame {
        /// Payload bytes received before EOF.
        bytes_received: usize,
        /// Payload size announced by the header.
        expected: usize,
    },

    /// The peer closed while the 4-byte length prefix was being read.
    #[error("premature EOF during header: {bytes_received} of {header_size} header bytes")]
    MidHeader {
        /// Header bytes received before EOF.
        bytes_received: usize,
        /// Size of the length prefix.
        header_size: usize,
    },
}

/// Top-level codec error.
///
/// # Examples
///
/// ```
/// use framerelay::codec::{CodecError, EofError, FramingError};
///
/// let err = CodecError::Framing(FramingError::OversizedFrame { size: 2000, max: 1024 });
/// assert_eq!(err.error_type(), "framing");
/// assert!(!err.is_clean_close());
///
/// assert!(CodecError::Eof(EofError::CleanClose).is_clean_close());
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// The length prefix was rejected.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended.
    #[error("EOF: {0}")]
    Eof(#[from] EofError),
}

impl CodecError {
    /// Recover the structured error carried inside an `io::Error`.
    ///
    /// Errors that did not originate in this codec are returned as
    /// [`CodecError::Io`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io;
    ///
    /// use framerelay::codec::{CodecError, EofError};
    ///
    /// let io_err: io::Error = CodecError::Eof(EofError::MidFrame {
    ///     bytes_received: 3,
    ///     expected: 5,
    /// })
    /// .into();
    /// assert!(matches!(
    ///     CodecError::from_io(io_err),
    ///     CodecError::Eof(EofError::MidFrame { expected: 5, .. })
    /// ));
    /// ```
    #[must_use]
    pub fn from_io(err: io::Error) -> Self {
        if let Some(inner) = err.get_ref() {
            if let Some(framing) = inner.downcast_ref::<FramingError>() {
                return Self::Framing(framing.clone());
            }
            if let Some(eof) = inner.downcast_ref::<EofError>() {
                return Self::Eof(*eof);
            }
        }
        Self::Io(err)
    }

    /// Returns true if the peer closed the stream at a frame boundary.
    #[must_use]
    pub fn is_clean_close(&self) -> bool { matches!(self, Self::Eof(EofError::CleanClose)) }

    /// Returns the error category for logging and metrics labels.
    ///
    /// One of `"framing"`, `"io"`, or `"eof"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing",
            Self::Io(_) => "io",
            Self::Eof(_) => "eof",
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Framing(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::Eof(e) => io::Error::new(io::ErrorKind::UnexpectedEof, e),
        }
    }
}
