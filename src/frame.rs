//! The unit of data moved through the relay.
//!
//! A [`Frame`] is one encoded image. The relay never looks inside it; the
//! payload is an opaque byte sequence backed by [`Bytes`], so handing the same
//! frame to many consumers is a reference-count bump rather than a copy.

use std::fmt;

use bytes::Bytes;

/// One encoded image payload.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap an encoded payload.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Borrow the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Clone the payload handle without copying the bytes.
    #[must_use]
    pub fn payload_bytes(&self) -> Bytes { self.payload.clone() }

    /// Consume the frame and return its payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Length of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.payload.len() }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.payload.is_empty() }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self { Self { payload } }
}

impl From<Vec<u8>> for Frame {
    fn from(payload: Vec<u8>) -> Self { Self::new(payload) }
}

impl From<Frame> for Bytes {
    fn from(frame: Frame) -> Self { frame.payload }
}

// Payloads can be megabytes; print the size only.
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("len", &self.len()).finish()
    }
}
