//! Builder-style configuration for [`FrameIngestor`].

use std::{sync::Arc, time::Duration};

use tokio::sync::oneshot;

use super::{
    BackoffConfig,
    DEFAULT_CLOSE_PAUSE,
    DEFAULT_MAX_CONNECTIONS,
    FrameIngestor,
    IngestState,
    Unbound,
};
use crate::{
    cache::LatestFrameCache,
    codec::{DEFAULT_MAX_FRAME_LENGTH, clamp_frame_length},
};

impl FrameIngestor<Unbound> {
    /// Create an ingestor publishing into `cache`.
    ///
    /// Call [`bind`](Self::bind) before running it.
    #[must_use]
    pub fn new(cache: Arc<LatestFrameCache>) -> Self {
        Self {
            cache,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            close_pause: DEFAULT_CLOSE_PAUSE,
            backoff_config: BackoffConfig::default(),
            ready_tx: None,
            state: Unbound,
        }
    }
}

impl<S> FrameIngestor<S>
where
    S: IngestState,
{
    /// Limit concurrent producer connections. The same value is used as the
    /// listen backlog when binding. Values below one are raised to one.
    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = count.max(1);
        self
    }

    /// Reject length prefixes above `bytes`.
    ///
    /// The value is clamped like [`FrameCodec::new`](crate::codec::FrameCodec::new).
    #[must_use]
    pub fn max_frame_length(mut self, bytes: usize) -> Self {
        self.max_frame_length = clamp_frame_length(bytes);
        self
    }

    /// Pause held after a connection closes before its slot is released.
    #[must_use]
    pub fn close_pause(mut self, pause: Duration) -> Self {
        self.close_pause = pause;
        self
    }

    /// Back-off applied when `accept()` itself fails.
    #[must_use]
    pub fn accept_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff_config = backoff.normalized();
        self
    }

    /// Notify `tx` once the accept loop is running.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Configured connection limit.
    #[must_use]
    pub const fn connection_limit(&self) -> u32 { self.max_connections }

    /// Configured maximum frame length.
    #[must_use]
    pub const fn frame_length_limit(&self) -> usize { self.max_frame_length }

    /// Shared cache frames are published into.
    #[must_use]
    pub fn cache(&self) -> &Arc<LatestFrameCache> { &self.cache }
}
