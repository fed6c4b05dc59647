//! Tests for ingestor runtime behaviour.

use std::{
    io,
    sync::{Arc, Mutex},
};

use rstest::rstest;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::{Semaphore, oneshot},
    task::yield_now,
    time::{Duration, Instant, advance, sleep, timeout},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{AcceptLoopOptions, BackoffConfig, MockAcceptListener, accept_loop};
use crate::{
    cache::LatestFrameCache,
    codec::FrameCodec,
    ingest::{
        FrameIngestor,
        connection::ConnectionOptions,
        test_util::{bind_ingestor, cache, free_listener},
    },
};

fn loop_options(token: &CancellationToken, tracker: &TaskTracker) -> AcceptLoopOptions {
    AcceptLoopOptions {
        connection: ConnectionOptions {
            cache: Arc::new(LatestFrameCache::new()),
            codec: FrameCodec::default(),
            close_pause: Duration::from_millis(10),
            shutdown: token.clone(),
        },
        slots: Arc::new(Semaphore::new(1)),
        tracker: tracker.clone(),
        backoff: BackoffConfig::default(),
    }
}

async fn send_raw(stream: &mut TcpStream, payload: &[u8]) {
    let len = u32::try_from(payload.len()).expect("payload fits u32");
    stream
        .write_all(&len.to_be_bytes())
        .await
        .expect("write header");
    stream.write_all(payload).await.expect("write payload");
}

async fn wait_for_payload(cache: &LatestFrameCache, expected: &[u8]) {
    timeout(Duration::from_secs(2), async {
        loop {
            if cache
                .read_latest()
                .is_some_and(|frame| frame.payload() == expected)
            {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("frame never reached the cache");
}

#[rstest]
#[tokio::test]
async fn run_with_immediate_shutdown(
    cache: Arc<LatestFrameCache>,
    free_listener: std::net::TcpListener,
) {
    let ingestor = bind_ingestor(cache, free_listener);
    let shutdown_future = async { sleep(Duration::from_millis(10)).await };
    let result = timeout(
        Duration::from_millis(1000),
        ingestor.run_with_shutdown(shutdown_future),
    )
    .await;
    assert!(result.expect("ingestor did not finish in time").is_ok());
}

#[rstest]
#[tokio::test]
async fn ready_signal_fires_once_accepting(
    cache: Arc<LatestFrameCache>,
    free_listener: std::net::TcpListener,
) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let ingestor = FrameIngestor::new(cache)
        .ready_signal(ready_tx)
        .bind_existing_listener(free_listener)
        .expect("bind");
    let handle = tokio::spawn(ingestor.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    timeout(Duration::from_secs(1), ready_rx)
        .await
        .expect("ready signal timed out")
        .expect("ready sender dropped");
    let _ = stop_tx.send(());
    handle
        .await
        .expect("ingestor join error")
        .expect("ingestor run failed");
}

#[rstest]
#[tokio::test]
async fn publishes_frames_from_a_real_producer(
    cache: Arc<LatestFrameCache>,
    free_listener: std::net::TcpListener,
) {
    let ingestor = bind_ingestor(Arc::clone(&cache), free_listener);
    let addr = ingestor.local_addr().expect("bound address");
    let token = CancellationToken::new();
    let stop = token.clone();
    let handle = tokio::spawn(ingestor.run_with_shutdown(async move { stop.cancelled().await }));

    let mut producer = TcpStream::connect(addr).await.expect("connect");
    send_raw(&mut producer, b"first").await;
    send_raw(&mut producer, b"second").await;
    wait_for_payload(&cache, b"second").await;

    token.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("shutdown should not wait for the idle producer")
        .expect("join")
        .expect("run");
}

#[rstest]
#[tokio::test]
async fn truncated_producer_does_not_stop_accepting(
    cache: Arc<LatestFrameCache>,
    free_listener: std::net::TcpListener,
) {
    let ingestor = bind_ingestor(Arc::clone(&cache), free_listener)
        .close_pause(Duration::from_millis(10));
    let addr = ingestor.local_addr().expect("bound address");
    let token = CancellationToken::new();
    let stop = token.clone();
    let handle = tokio::spawn(ingestor.run_with_shutdown(async move { stop.cancelled().await }));

    let mut broken = TcpStream::connect(addr).await.expect("connect");
    broken
        .write_all(&[0x00, 0x00, 0x01, 0x00, 0xff, 0xd8])
        .await
        .expect("write partial frame");
    drop(broken);

    let mut healthy = TcpStream::connect(addr).await.expect("reconnect");
    send_raw(&mut healthy, b"after failure").await;
    wait_for_payload(&cache, b"after failure").await;

    token.cancel();
    handle.await.expect("join").expect("run");
}

#[rstest]
#[tokio::test]
async fn connections_beyond_the_limit_wait_for_a_slot(
    cache: Arc<LatestFrameCache>,
    free_listener: std::net::TcpListener,
) {
    let ingestor = bind_ingestor(Arc::clone(&cache), free_listener)
        .max_connections(1)
        .close_pause(Duration::from_millis(10));
    let addr = ingestor.local_addr().expect("bound address");
    let token = CancellationToken::new();
    let stop = token.clone();
    let handle = tokio::spawn(ingestor.run_with_shutdown(async move { stop.cancelled().await }));

    let mut first = TcpStream::connect(addr).await.expect("connect first");
    send_raw(&mut first, b"one").await;
    wait_for_payload(&cache, b"one").await;

    // Sits in the backlog until the first producer's slot is released.
    let mut second = TcpStream::connect(addr).await.expect("connect second");
    send_raw(&mut second, b"two").await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.read_latest().expect("frame").payload(), b"one");

    drop(first);
    wait_for_payload(&cache, b"two").await;

    token.cancel();
    handle.await.expect("join").expect("run");
}

#[tokio::test]
async fn accept_loop_stops_on_shutdown() {
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let listener = Arc::new(
        TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener"),
    );

    tracker.spawn(accept_loop(listener, loop_options(&token, &tracker)));

    token.cancel();
    tracker.close();

    let result = timeout(Duration::from_millis(100), tracker.wait()).await;
    assert!(result.is_ok());
}

/// Creates a mock listener whose every accept fails, logging call times.
fn failing_listener(calls: &Arc<Mutex<Vec<Instant>>>, num_calls: usize) -> MockAcceptListener {
    let mut listener = MockAcceptListener::new();
    let call_log = Arc::clone(calls);
    listener
        .expect_accept()
        .returning(move || {
            let call_log = Arc::clone(&call_log);
            Box::pin(async move {
                call_log.lock().expect("lock").push(Instant::now());
                Err(io::Error::other("mock error"))
            })
        })
        .times(num_calls);
    listener
        .expect_local_addr()
        .returning(|| Ok("127.0.0.1:0".parse().expect("addr parse")))
        .times(num_calls);
    listener
}

#[tokio::test(start_paused = true)]
async fn accept_errors_back_off_exponentially() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(failing_listener(&calls, 4));
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let mut options = loop_options(&token, &tracker);
    options.backoff = BackoffConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    };

    tracker.spawn(accept_loop(listener, options));
    yield_now().await;
    assert_eq!(calls.lock().expect("lock").len(), 1);

    for ms in [5, 10, 20] {
        advance(Duration::from_millis(ms)).await;
        yield_now().await;
    }

    token.cancel();
    advance(Duration::from_millis(20)).await;
    yield_now().await;
    tracker.close();
    tracker.wait().await;

    let calls = calls.lock().expect("lock");
    let intervals: Vec<Duration> = calls
        .windows(2)
        .filter_map(|pair| match pair {
            [a, b] => b.checked_duration_since(*a),
            _ => None,
        })
        .collect();
    assert_eq!(
        intervals,
        [
            Duration::from_millis(5),
            Duration::from_millis(10),
            Duration::from_millis(20),
        ]
    );
}
