//! Errors raised by [`FrameIngestor`](super::FrameIngestor) operations.
//!
//! Per-connection decode failures are not errors at this level: they close the
//! affected connection and are reported through logs and metrics only.

use std::io;

use thiserror::Error;

/// Errors that may occur while setting up or running the ingestor.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Creating, binding, or listening on the socket failed.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),
}
