//! Error types for producer client operations.

use std::io;

use crate::{codec::CodecError, source::SourceError};

/// Errors emitted by [`FrameClient`](super::FrameClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connecting or writing to the relay failed.
    #[error("transport error: {0}")]
    Io(#[source] io::Error),
    /// The frame could not be framed, for example because it is too large.
    #[error("codec error: {0}")]
    Codec(#[source] CodecError),
    /// The frame source failed.
    #[error("frame source error: {0}")]
    Source(#[from] SourceError),
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        match CodecError::from_io(err) {
            CodecError::Io(e) => Self::Io(e),
            other => Self::Codec(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::ClientError;
    use crate::codec::{CodecError, FramingError};

    #[test]
    fn plain_io_errors_stay_transport_errors() {
        let err = ClientError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, ClientError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn codec_errors_are_recovered() {
        let io_err: io::Error = CodecError::Framing(FramingError::OversizedFrame {
            size: 100,
            max: 64,
        })
        .into();
        assert!(matches!(
            ClientError::from(io_err),
            ClientError::Codec(CodecError::Framing(_))
        ));
    }
}
