//! Per-connection decode loop for [`FrameIngestor`](super::FrameIngestor).

use std::{any::Any, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::{FutureExt, StreamExt};
use tokio::{
    io::AsyncRead,
    net::TcpStream,
    select,
    sync::OwnedSemaphorePermit,
    time::sleep,
};
use tokio_util::{codec::FramedRead, sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

use crate::{
    cache::LatestFrameCache,
    codec::{CodecError, FrameCodec},
    metrics,
};

const INITIAL_READ_BUFFER_CAPACITY: usize = 64 * 1024;

/// Everything a connection task needs besides its stream.
#[derive(Clone, Debug)]
pub(super) struct ConnectionOptions {
    pub cache: Arc<LatestFrameCache>,
    pub codec: FrameCodec,
    pub close_pause: Duration,
    pub shutdown: CancellationToken,
}

/// How a decode loop ended.
#[derive(Debug)]
pub(super) enum ConnectionEnd {
    /// Peer closed at a frame boundary.
    Closed,
    /// The ingestor is shutting down.
    Shutdown,
    /// Decoding failed; nothing from the failed frame was published.
    Failed(CodecError),
}

#[derive(Debug)]
pub(super) struct ConnectionOutcome {
    pub frames_published: u64,
    pub end: ConnectionEnd,
}

/// Spawn a task that drains frames from `stream` into the cache.
///
/// The task keeps `permit` until the connection has closed and the close
/// pause has elapsed, which is what throttles the accept loop.
pub(super) fn spawn_connection_task(
    stream: TcpStream,
    options: ConnectionOptions,
    permit: OwnedSemaphorePermit,
    tracker: &TaskTracker,
) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => Some(addr),
        Err(e) => {
            warn!(error = %e, "failed to retrieve peer address");
            None
        }
    };
    tracker.spawn(async move {
        metrics::inc_connections();
        info!(?peer_addr, "producer connected");

        let result = AssertUnwindSafe(process_stream(stream, &options))
            .catch_unwind()
            .await;
        match result {
            Ok(outcome) => log_outcome(&outcome, peer_addr),
            Err(panic) => {
                let panic_msg = panic_message(panic.as_ref());
                error!(panic = %panic_msg, ?peer_addr, "connection task panicked");
            }
        }
        metrics::dec_connections();

        select! {
            biased;
            () = options.shutdown.cancelled() => {}
            () = sleep(options.close_pause) => {}
        }
        drop(permit);
    });
}

/// Decode frames from `stream` and publish each one until the stream ends,
/// fails, or shutdown is requested.
pub(super) async fn process_stream<S>(stream: S, options: &ConnectionOptions) -> ConnectionOutcome
where
    S: AsyncRead + Unpin,
{
    let mut frames = FramedRead::with_capacity(
        stream,
        options.codec,
        INITIAL_READ_BUFFER_CAPACITY.min(options.codec.max_frame_length()),
    );
    let mut frames_published = 0_u64;

    loop {
        let next = select! {
            biased;
            () = options.shutdown.cancelled() => {
                return ConnectionOutcome { frames_published, end: ConnectionEnd::Shutdown };
            }
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                options.cache.publish(frame);
                frames_published += 1;
                metrics::inc_frames_ingested();
            }
            Some(Err(err)) => {
                return ConnectionOutcome {
                    frames_published,
                    end: ConnectionEnd::Failed(CodecError::from_io(err)),
                };
            }
            None => {
                return ConnectionOutcome {
                    frames_published,
                    end: ConnectionEnd::Closed,
                };
            }
        }
    }
}

fn log_outcome(outcome: &ConnectionOutcome, peer_addr: Option<SocketAddr>) {
    let frames = outcome.frames_published;
    match &outcome.end {
        ConnectionEnd::Closed => {
            info!(?peer_addr, frames, "producer disconnected");
        }
        ConnectionEnd::Shutdown => {
            info!(?peer_addr, frames, "producer connection closed for shutdown");
        }
        ConnectionEnd::Failed(err) => {
            metrics::inc_framing_errors(err.error_type());
            warn!(
                ?peer_addr,
                frames,
                error = %err,
                kind = err.error_type(),
                "producer connection dropped"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else {
        "non-string panic payload".to_owned()
    }
}
