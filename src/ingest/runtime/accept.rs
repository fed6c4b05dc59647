//! Accept loop for the ingestor runtime.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use log::warn;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    sync::Semaphore,
    time::{Duration, sleep},
};
use tokio_util::task::TaskTracker;

use super::backoff::BackoffConfig;
use crate::ingest::connection::{ConnectionOptions, spawn_connection_task};

/// Source of incoming producer connections.
///
/// Implementations must be cancellation-safe: dropping a pending `accept()`
/// future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(in crate::ingest) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

#[derive(Debug)]
pub(in crate::ingest) struct AcceptLoopOptions {
    pub connection: ConnectionOptions,
    pub slots: Arc<Semaphore>,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
}

/// Accept producer connections until shutdown.
///
/// Each iteration first waits for a free connection slot, then accepts. An
/// accepted stream is handed to its own task together with the slot, so at
/// most `slots` producers are decoded at once. `accept()` failures sleep with
/// exponential back-off; a success resets the delay.
pub(in crate::ingest) async fn accept_loop<L>(listener: Arc<L>, options: AcceptLoopOptions)
where
    L: AcceptListener + 'static,
{
    let backoff = options.backoff.normalized();
    debug_assert!(
        backoff.initial_delay <= backoff.max_delay,
        "BackoffConfig invariant violated: initial_delay > max_delay"
    );
    let mut delay = backoff.initial_delay;
    while let Some(next_delay) = accept_iteration(listener.as_ref(), &options, &backoff, delay).await
    {
        delay = next_delay;
    }
}

async fn accept_iteration<L>(
    listener: &L,
    options: &AcceptLoopOptions,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    L: AcceptListener,
{
    let shutdown = &options.connection.shutdown;
    let permit = select! {
        biased;

        () = shutdown.cancelled() => return None,
        permit = Arc::clone(&options.slots).acquire_owned() => permit.ok()?,
    };

    select! {
        biased;

        () = shutdown.cancelled() => None,
        res = listener.accept() => Some(match res {
            Ok((stream, _)) => {
                spawn_connection_task(stream, options.connection.clone(), permit, &options.tracker);
                backoff.initial_delay
            }
            Err(e) => {
                drop(permit);
                let local_addr = listener.local_addr().ok();
                warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                sleep(delay).await;
                backoff.next_delay(delay)
            }
        }),
    }
}
