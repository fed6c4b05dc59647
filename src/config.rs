//! Relay configuration.
//!
//! [`RelayConfig`] gathers every tunable of the relay process. Its
//! [`Default`] carries the stock deployment values: producers on port 9999,
//! viewers on port 5000.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use crate::{
    codec::DEFAULT_MAX_FRAME_LENGTH,
    emitter::EmitterConfig,
    ingest::{DEFAULT_CLOSE_PAUSE, DEFAULT_MAX_CONNECTIONS},
};

/// Default producer-facing listen address.
pub const DEFAULT_INGEST_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9999);

/// Default viewer-facing HTTP listen address.
pub const DEFAULT_HTTP_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000);

/// Settings for [`Relay`](crate::relay::Relay).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use framerelay::config::RelayConfig;
///
/// let config = RelayConfig::default()
///     .max_connections(2)
///     .close_pause(Duration::from_millis(100));
/// assert_eq!(config.max_connections, 2);
/// assert_eq!(config.ingest_addr.port(), 9999);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address producers connect to.
    pub ingest_addr: SocketAddr,
    /// Address the HTTP server listens on.
    pub http_addr: SocketAddr,
    /// Listen backlog and concurrent producer limit.
    pub max_connections: u32,
    /// Largest accepted frame payload in bytes.
    pub max_frame_length: usize,
    /// Pause after a producer connection closes before its slot frees up.
    pub close_pause: Duration,
    /// Part cadence and idle poll of the HTTP stream.
    pub emitter: EmitterConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ingest_addr: DEFAULT_INGEST_ADDR,
            http_addr: DEFAULT_HTTP_ADDR,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            close_pause: DEFAULT_CLOSE_PAUSE,
            emitter: EmitterConfig::default(),
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn ingest_addr(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    #[must_use]
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    #[must_use]
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = count;
        self
    }

    #[must_use]
    pub fn max_frame_length(mut self, bytes: usize) -> Self {
        self.max_frame_length = bytes;
        self
    }

    #[must_use]
    pub fn close_pause(mut self, pause: Duration) -> Self {
        self.close_pause = pause;
        self
    }

    #[must_use]
    pub fn emitter(mut self, emitter: EmitterConfig) -> Self {
        self.emitter = emitter;
        self
    }
}
