//! The relay process: ingest listener and HTTP server over one cache.

use std::{io, net::SocketAddr, sync::Arc};

use futures::Future;
use thiserror::Error;
use tokio::{net::TcpListener, select, signal, sync::oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    cache::LatestFrameCache,
    config::RelayConfig,
    emitter::{EmitterConfig, StreamEmitter},
    http,
    ingest::{Bound, FrameIngestor, IngestError},
};

/// Errors that stop the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The producer listener could not be set up.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// The HTTP listener could not be bound.
    #[error("failed to bind http listener on {addr}: {source}")]
    HttpBind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The HTTP server stopped with an error.
    #[error("http server failed: {0}")]
    Http(#[source] io::Error),
}

/// A relay with both listeners bound, ready to run.
///
/// # Examples
///
/// ```no_run
/// use framerelay::{config::RelayConfig, relay::Relay};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), framerelay::relay::RelayError> {
/// Relay::bind(RelayConfig::default()).await?.run().await
/// # }
/// ```
pub struct Relay {
    cache: Arc<LatestFrameCache>,
    ingestor: FrameIngestor<Bound>,
    http_listener: TcpListener,
    emitter_config: EmitterConfig,
}

impl Relay {
    /// Bind the ingest and HTTP listeners described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Ingest`] or [`RelayError::HttpBind`] if either
    /// listener cannot be bound.
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        let cache = Arc::new(LatestFrameCache::new());
        let ingestor = FrameIngestor::new(Arc::clone(&cache))
            .max_connections(config.max_connections)
            .max_frame_length(config.max_frame_length)
            .close_pause(config.close_pause)
            .bind(config.ingest_addr)?;
        let http_listener = TcpListener::bind(config.http_addr)
            .await
            .map_err(|source| RelayError::HttpBind {
                addr: config.http_addr,
                source,
            })?;
        Ok(Self {
            cache,
            ingestor,
            http_listener,
            emitter_config: config.emitter,
        })
    }

    /// Notify `tx` once producers can connect.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ingestor = self.ingestor.ready_signal(tx);
        self
    }

    #[must_use]
    pub fn ingest_addr(&self) -> Option<SocketAddr> { self.ingestor.local_addr() }

    #[must_use]
    pub fn http_addr(&self) -> Option<SocketAddr> { self.http_listener.local_addr().ok() }

    /// The cache shared by the ingestor and every HTTP consumer.
    #[must_use]
    pub fn cache(&self) -> &Arc<LatestFrameCache> { &self.cache }

    /// Run until Ctrl+C is received.
    ///
    /// # Errors
    ///
    /// See [`run_with_shutdown`](Self::run_with_shutdown).
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run until `shutdown` resolves.
    ///
    /// Shutdown stops accepting producers, closes their connections, ends every
    /// open HTTP stream, and waits for the HTTP server to drain. If the HTTP
    /// server fails, the ingestor is stopped as well.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the HTTP server stops with an error.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send,
    {
        let Relay {
            cache,
            ingestor,
            http_listener,
            emitter_config,
        } = self;
        let token = CancellationToken::new();
        let emitter = StreamEmitter::new(cache)
            .config(emitter_config)
            .shutdown_token(token.clone());

        let ingest = ingestor.run_with_shutdown(token.clone().cancelled_owned());
        let http = {
            let token = token.clone();
            async move {
                let res = http::serve(http_listener, emitter, token.clone()).await;
                token.cancel();
                res
            }
        };
        let stop = {
            let token = token.clone();
            async move {
                select! {
                    () = shutdown => info!("relay shutdown requested"),
                    () = token.cancelled() => {}
                }
                token.cancel();
            }
        };

        let (ingest_res, http_res, ()) = tokio::join!(ingest, http, stop);
        ingest_res?;
        http_res.map_err(RelayError::Http)
    }
}
