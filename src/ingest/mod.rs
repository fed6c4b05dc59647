//! Producer-facing listener for the length-prefixed frame protocol.
//!
//! [`FrameIngestor`] accepts TCP connections from producers, runs an
//! independent decode loop per connection, and publishes every complete frame
//! into a shared [`LatestFrameCache`]. A decode failure closes only the
//! connection it happened on; the listener keeps accepting.
//!
//! The ingestor carries a typestate `S` recording whether it is [`Unbound`] or
//! [`Bound`]. Only bound ingestors expose [`FrameIngestor::run`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framerelay::{cache::LatestFrameCache, ingest::FrameIngestor};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), framerelay::ingest::IngestError> {
//! let cache = Arc::new(LatestFrameCache::new());
//! FrameIngestor::new(cache)
//!     .max_connections(5)
//!     .bind(([0, 0, 0, 0], 9999).into())?
//!     .run()
//!     .await
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot};

use crate::cache::LatestFrameCache;

mod binding;
mod config;
mod connection;
pub mod error;
mod runtime;

pub use error::IngestError;
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;

/// Default number of producer connections served at once. Also used as the
/// listen backlog.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default pause after a producer connection closes.
///
/// The pause holds only the closed connection's slot; other free slots keep
/// accepting.
pub const DEFAULT_CLOSE_PAUSE: Duration = Duration::from_millis(500);

/// TCP listener that decodes producer frames into a [`LatestFrameCache`].
pub struct FrameIngestor<S = Unbound>
where
    S: IngestState,
{
    pub(crate) cache: Arc<LatestFrameCache>,
    pub(crate) max_connections: u32,
    pub(crate) max_frame_length: usize,
    pub(crate) close_pause: Duration,
    pub(crate) backoff_config: BackoffConfig,
    /// Fired once the accept loop is running. Single use: supply a fresh
    /// sender for every run.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) state: S,
}

/// Marker indicating the ingestor has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the ingestor owns a bound TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Implemented by [`Unbound`] and [`Bound`].
pub trait IngestState: sealed::Sealed {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl IngestState for Unbound {}
impl IngestState for Bound {}
