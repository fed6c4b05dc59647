//! Listener binding for [`FrameIngestor`].

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::{TcpListener, TcpSocket};

use super::{Bound, FrameIngestor, IngestError, IngestState, Unbound};

impl<S> FrameIngestor<S>
where
    S: IngestState,
{
    fn with_listener(self, listener: TcpListener) -> FrameIngestor<Bound> {
        let FrameIngestor {
            cache,
            max_connections,
            max_frame_length,
            close_pause,
            backoff_config,
            ready_tx,
            ..
        } = self;
        FrameIngestor {
            cache,
            max_connections,
            max_frame_length,
            close_pause,
            backoff_config,
            ready_tx,
            state: Bound {
                listener: Arc::new(listener),
            },
        }
    }

    fn bind_addr(self, addr: SocketAddr) -> Result<FrameIngestor<Bound>, IngestError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(IngestError::Bind)?;
        // Restarting the relay must not wait for TIME_WAIT sockets to drain.
        socket.set_reuseaddr(true).map_err(IngestError::Bind)?;
        socket.bind(addr).map_err(IngestError::Bind)?;
        let listener = socket
            .listen(self.max_connections)
            .map_err(IngestError::Bind)?;
        Ok(self.with_listener(listener))
    }

    fn adopt_std_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<FrameIngestor<Bound>, IngestError> {
        std_listener
            .set_nonblocking(true)
            .map_err(IngestError::Bind)?;
        let listener = TcpListener::from_std(std_listener).map_err(IngestError::Bind)?;
        Ok(self.with_listener(listener))
    }
}

impl FrameIngestor<Unbound> {
    /// Return `None`; the ingestor is not bound yet.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }

    /// Bind to `addr`, using the connection limit as the listen backlog.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::{
    ///     net::{Ipv4Addr, SocketAddr},
    ///     sync::Arc,
    /// };
    ///
    /// use framerelay::{cache::LatestFrameCache, ingest::FrameIngestor};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let ingestor = FrameIngestor::new(Arc::new(LatestFrameCache::new()))
    ///     .bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    ///     .expect("bind failed");
    /// assert!(ingestor.local_addr().is_some());
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`IngestError::Bind`] if creating, binding, or listening on the
    /// socket fails.
    pub fn bind(self, addr: SocketAddr) -> Result<FrameIngestor<Bound>, IngestError> {
        self.bind_addr(addr)
    }

    /// Adopt an already bound standard listener.
    ///
    /// # Errors
    /// Returns [`IngestError::Bind`] if the listener cannot be registered with
    /// the runtime.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<FrameIngestor<Bound>, IngestError> {
        self.adopt_std_listener(std_listener)
    }
}

impl FrameIngestor<Bound> {
    /// Returns the bound address, or `None` if retrieving it fails.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }

    /// Rebind to a fresh address.
    ///
    /// # Errors
    /// Returns [`IngestError::Bind`] if binding fails.
    pub fn bind(self, addr: SocketAddr) -> Result<Self, IngestError> { self.bind_addr(addr) }

    /// Rebind to an existing standard listener.
    ///
    /// # Errors
    /// Returns [`IngestError::Bind`] if the listener cannot be registered.
    pub fn bind_existing_listener(self, std_listener: StdTcpListener) -> Result<Self, IngestError> {
        self.adopt_std_listener(std_listener)
    }
}
