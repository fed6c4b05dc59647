//! Runtime control for [`FrameIngestor`].

mod accept;
mod backoff;
#[cfg(test)]
mod tests;

use std::sync::Arc;

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use tokio::{select, signal, sync::Semaphore};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

use super::{Bound, FrameIngestor, IngestError, connection::ConnectionOptions};
use crate::codec::FrameCodec;

impl FrameIngestor<Bound> {
    /// Run until Ctrl+C is received.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept failures are retried with
    /// back-off and decode failures only close the affected connection.
    pub async fn run(self) -> Result<(), IngestError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run until the `shutdown` future resolves.
    ///
    /// On shutdown the accept loop stops, every open producer connection is
    /// closed, and this future completes once all connection tasks have
    /// finished.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use framerelay::{cache::LatestFrameCache, ingest::FrameIngestor};
    /// use tokio::sync::oneshot;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), framerelay::ingest::IngestError> {
    /// let ingestor = FrameIngestor::new(Arc::new(LatestFrameCache::new()))
    ///     .bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(ingestor.run_with_shutdown(async {
    ///     let _ = rx.await;
    /// }));
    ///
    /// let _ = tx.send(());
    /// handle.await.expect("join ingestor task")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<(), IngestError>
    where
        F: Future<Output = ()> + Send,
    {
        let FrameIngestor {
            cache,
            max_connections,
            max_frame_length,
            close_pause,
            backoff_config,
            ready_tx,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let local_addr = listener.local_addr().ok();

        let options = AcceptLoopOptions {
            connection: ConnectionOptions {
                cache,
                codec: FrameCodec::new(max_frame_length),
                close_pause,
                shutdown: shutdown_token.clone(),
            },
            slots: Arc::new(Semaphore::new(max_connections as usize)),
            tracker: tracker.clone(),
            backoff: backoff_config,
        };
        tracker.spawn(accept_loop(listener, options));
        info!(?local_addr, max_connections, "frame ingestor accepting producers");

        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => shutdown_token.cancel(),
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        info!(?local_addr, "frame ingestor stopped");
        Ok(())
    }
}
