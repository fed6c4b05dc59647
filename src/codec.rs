//! Length-prefixed framing for the producer wire protocol.
//!
//! Every frame travels as a 4-byte big-endian length followed by exactly that
//! many payload bytes. There is no handshake, acknowledgement or terminator:
//! the stream simply ends when the producer closes its socket.
//!
//! [`FrameCodec`] implements both halves of the protocol as a
//! `tokio_util` [`Decoder`]/[`Encoder`] pair, so it plugs straight into
//! [`FramedRead`](tokio_util::codec::FramedRead) on the relay and
//! [`Framed`](tokio_util::codec::Framed) on the producer.
//!
//! Unlike a naive reader, the decoder rejects any length prefix above the
//! configured maximum before buffering the payload. Truncated streams surface
//! as [`EofError::MidHeader`] or [`EofError::MidFrame`] so that a partial frame
//! can never reach the cache.

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    byte_order::{read_network_u32, write_network_u32},
    frame::Frame,
};

pub mod error;

pub use error::{CodecError, EofError, FramingError};

/// Length prefix header size (4 bytes for big-endian u32).
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Smallest maximum frame length a codec may be configured with.
pub const MIN_FRAME_LENGTH: usize = 64;

/// Largest payload the length prefix can describe.
pub const MAX_FRAME_LENGTH: usize = u32::MAX as usize;

/// Default maximum payload size (16 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH)
}

/// Codec for the `u32` length-prefixed frame protocol.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use framerelay::{codec::FrameCodec, frame::Frame};
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = FrameCodec::default();
/// let mut buf = BytesMut::new();
/// codec.encode(Frame::new(&b"jpeg"[..]), &mut buf).expect("encode");
/// assert_eq!(&buf[..4], &[0, 0, 0, 4]);
///
/// let frame = codec.decode(&mut buf).expect("decode").expect("complete frame");
/// assert_eq!(frame.payload(), b"jpeg");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FrameCodec {
    max_frame_length: usize,
}

impl FrameCodec {
    /// Construct a codec with a maximum payload length.
    ///
    /// The value is clamped between [`MIN_FRAME_LENGTH`] and
    /// [`MAX_FRAME_LENGTH`].
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            max_frame_length: clamp_frame_length(max_frame_length),
        }
    }

    /// Return the maximum payload length accepted by this codec.
    #[must_use]
    pub fn max_frame_length(&self) -> usize { self.max_frame_length }

    fn oversized(&self, size: usize) -> io::Error {
        CodecError::Framing(FramingError::OversizedFrame {
            size,
            max: self.max_frame_length,
        })
        .into()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

fn peek_length(src: &BytesMut) -> Option<usize> {
    src.get(..LENGTH_HEADER_SIZE)
        .and_then(|slice| <[u8; LENGTH_HEADER_SIZE]>::try_from(slice).ok())
        .map(|bytes| read_network_u32(bytes) as usize)
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(size) = peek_length(src) else {
            return Ok(None);
        };
        if size > self.max_frame_length {
            return Err(self.oversized(size));
        }

        // The header stays in the buffer until the whole payload is present,
        // so a partial frame is never handed out.
        let total = LENGTH_HEADER_SIZE + size;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_HEADER_SIZE);
        Ok(Some(Frame::from(src.split_to(size).freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => Err(build_eof_error(src)),
        }
    }
}

/// Build the EOF error describing how far the truncated frame got.
///
/// - [`EofError::MidHeader`]: fewer than 4 bytes were buffered.
/// - [`EofError::MidFrame`]: the header was complete but the payload was not.
fn build_eof_error(src: &BytesMut) -> io::Error {
    let bytes_received = src.len();
    match peek_length(src) {
        Some(expected) => CodecError::Eof(EofError::MidFrame {
            bytes_received: bytes_received.saturating_sub(LENGTH_HEADER_SIZE),
            expected,
        })
        .into(),
        None => CodecError::Eof(EofError::MidHeader {
            bytes_received,
            header_size: LENGTH_HEADER_SIZE,
        })
        .into(),
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = item.len();
        if size > self.max_frame_length {
            return Err(self.oversized(size));
        }
        let length = u32::try_from(size).map_err(|_| self.oversized(size))?;

        dst.reserve(LENGTH_HEADER_SIZE + size);
        dst.put_slice(&write_network_u32(length));
        dst.put_slice(item.payload());
        Ok(())
    }
}
