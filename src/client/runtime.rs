//! Producer client runtime implementation.

use std::{fmt, net::SocketAddr, time::Duration};

use futures::SinkExt;
use tokio::{net::TcpStream, select, time::sleep};
use tokio_util::{codec::Framed, sync::CancellationToken};
use tracing::{debug, info, warn};

use super::{ClientConfig, ClientError, ClientState};
use crate::{codec::FrameCodec, frame::Frame, metrics, source::FrameSource};

/// An open connection to a relay's ingest port.
pub struct FrameConnection {
    framed: Framed<TcpStream, FrameCodec>,
    peer_addr: Option<SocketAddr>,
}

impl fmt::Debug for FrameConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameConnection")
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

impl FrameConnection {
    fn new(stream: TcpStream, codec: FrameCodec) -> Self {
        let peer_addr = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "failed to set TCP_NODELAY");
        }
        Self {
            framed: Framed::new(stream, codec),
            peer_addr,
        }
    }

    /// Write `frame` as one length-prefixed message and flush it.
    ///
    /// The header and payload are encoded into a single buffer before any
    /// byte is written, so the relay never sees a header without its payload
    /// unless the connection itself breaks.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Codec`] if the frame exceeds the configured
    /// maximum (nothing is written) and [`ClientError::Io`] if the write
    /// fails.
    pub async fn send_frame(&mut self, frame: Frame) -> Result<(), ClientError> {
        self.framed.send(frame).await.map_err(ClientError::from)
    }

    /// Address of the relay, if it could be determined.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> { self.peer_addr }
}

enum StreamEnd {
    Shutdown,
    SendFailed(ClientError),
}

/// Retrying producer connection to a relay.
///
/// # Examples
///
/// ```no_run
/// use framerelay::{client::FrameClient, source::DirectorySource};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let shutdown = CancellationToken::new();
/// let mut client = FrameClient::new("127.0.0.1:9999").shutdown_token(shutdown.clone());
/// let mut source = DirectorySource::new("./frames");
/// client.run(&mut source).await;
/// # }
/// ```
#[derive(Debug)]
pub struct FrameClient {
    addr: String,
    config: ClientConfig,
    state: ClientState,
    shutdown: CancellationToken,
}

impl FrameClient {
    /// Create a client for the relay at `addr` (`host:port`).
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            config: ClientConfig::default(),
            state: ClientState::Disconnected,
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the reconnect and pacing settings.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop connecting and streaming once `token` is cancelled.
    #[must_use]
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    #[must_use]
    pub const fn state(&self) -> ClientState { self.state }

    #[must_use]
    pub fn addr(&self) -> &str { &self.addr }

    /// Connect to the relay, retrying with the fixed reconnect delay until it
    /// succeeds.
    ///
    /// Returns `None` only if the client is cancelled first.
    pub async fn connect(&mut self) -> Option<FrameConnection> {
        self.state = ClientState::Connecting;
        let delay = self.config.delay();
        let mut attempt = 0_u64;
        loop {
            attempt += 1;
            debug!(addr = %self.addr, attempt, "connecting to relay");
            let result = select! {
                biased;
                () = self.shutdown.cancelled() => None,
                res = TcpStream::connect(self.addr.as_str()) => Some(res),
            };
            match result {
                None => break,
                Some(Ok(stream)) => {
                    let conn = FrameConnection::new(
                        stream,
                        FrameCodec::new(self.config.frame_length_limit()),
                    );
                    info!(addr = %self.addr, peer = ?conn.peer_addr(), attempt, "connected to relay");
                    self.state = ClientState::Streaming;
                    return Some(conn);
                }
                Some(Err(e)) => {
                    warn!(addr = %self.addr, error = %e, retry_in = ?delay, "connection to relay failed");
                    if !self.pause(delay).await {
                        break;
                    }
                }
            }
        }
        self.state = ClientState::Disconnected;
        None
    }

    /// Stream frames from `source` until cancelled.
    ///
    /// Each cycle connects, then sends one frame per frame interval. A failed
    /// send discards the connection, releases `source`, and waits the
    /// cooldown before reconnecting.
    pub async fn run<S>(&mut self, source: &mut S)
    where
        S: FrameSource + ?Sized,
    {
        while let Some(mut conn) = self.connect().await {
            let end = self.stream(&mut conn, source).await;
            drop(conn);
            self.state = ClientState::Disconnected;

            match end {
                StreamEnd::Shutdown => break,
                StreamEnd::SendFailed(err) => {
                    let cooldown = self.config.cooldown();
                    warn!(error = %err, ?cooldown, "send to relay failed; reconnecting");
                    source.release();
                    metrics::inc_client_reconnects();
                    if !self.pause(cooldown).await {
                        break;
                    }
                }
            }
        }
        source.release();
        self.state = ClientState::Disconnected;
        info!(addr = %self.addr, "frame client stopped");
    }

    async fn stream<S>(&self, conn: &mut FrameConnection, source: &mut S) -> StreamEnd
    where
        S: FrameSource + ?Sized,
    {
        loop {
            let next = select! {
                biased;
                () = self.shutdown.cancelled() => return StreamEnd::Shutdown,
                next = source.next_frame() => next,
            };

            match next {
                Ok(frame) => {
                    let sent = select! {
                        biased;
                        () = self.shutdown.cancelled() => return StreamEnd::Shutdown,
                        sent = conn.send_frame(frame) => sent,
                    };
                    match sent {
                        Ok(()) => {}
                        // Rejected before any byte was written; the stream is intact.
                        Err(ClientError::Codec(err)) => warn!(error = %err, "dropping unsendable frame"),
                        Err(err) => return StreamEnd::SendFailed(err),
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "skipping frame");
                }
                Err(err) => {
                    let delay = self.config.delay();
                    warn!(error = %err, retry_in = ?delay, "frame source unavailable");
                    source.release();
                    if !self.pause(delay).await {
                        return StreamEnd::Shutdown;
                    }
                    continue;
                }
            }

            if !self.pause(self.config.interval()).await {
                return StreamEnd::Shutdown;
            }
        }
    }

    /// Sleep for `duration`. Returns `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        select! {
            biased;
            () = self.shutdown.cancelled() => false,
            () = sleep(duration) => true,
        }
    }
}
