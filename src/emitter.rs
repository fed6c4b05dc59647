//! Multipart replace-stream generator for HTTP consumers.
//!
//! A [`StreamEmitter`] turns the shared [`LatestFrameCache`] into a lazy,
//! endless sequence of `multipart/x-mixed-replace` parts. Each call to
//! [`StreamEmitter::stream`] yields an independent sequence, so every consumer
//! samples the cache on its own clock and no per-consumer queue exists.
//!
//! Sampling is leaky: a tick always serves whatever frame is latest, repeating
//! a frame when ingestion is slow and skipping frames when it is fast.

use std::{sync::Arc, time::Duration};

use bytes::{BufMut, Bytes, BytesMut};
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{cache::LatestFrameCache, frame::Frame, metrics};

/// `Content-Type` of the streaming HTTP response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Default pause between two emitted parts.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(30);

/// Default retry interval while the cache has never held a frame.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(100);

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const PART_TRAILER: &[u8] = b"\r\n";

/// Wrap `frame` as one multipart part.
///
/// # Examples
///
/// ```
/// use framerelay::{emitter::encode_chunk, frame::Frame};
///
/// let chunk = encode_chunk(&Frame::new(&b"JPEG"[..]));
/// assert_eq!(
///     &chunk[..],
///     b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n"
/// );
/// ```
#[must_use]
pub fn encode_chunk(frame: &Frame) -> Bytes {
    let mut buf = BytesMut::with_capacity(PART_HEADER.len() + frame.len() + PART_TRAILER.len());
    buf.put_slice(PART_HEADER);
    buf.put_slice(frame.payload());
    buf.put_slice(PART_TRAILER);
    buf.freeze()
}

/// Timing of emitted parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Pause after each emitted part.
    pub cadence: Duration,
    /// Retry interval while no frame has ever been published.
    pub idle_poll: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }
}

/// Factory for per-consumer part streams over one shared cache.
#[derive(Clone, Debug)]
pub struct StreamEmitter {
    cache: Arc<LatestFrameCache>,
    config: EmitterConfig,
    shutdown: CancellationToken,
}

impl StreamEmitter {
    /// Create an emitter sampling `cache` with the default cadence.
    #[must_use]
    pub fn new(cache: Arc<LatestFrameCache>) -> Self {
        Self {
            cache,
            config: EmitterConfig::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the cadence and idle poll settings.
    #[must_use]
    pub fn config(mut self, config: EmitterConfig) -> Self {
        self.config = config;
        self
    }

    /// End every stream produced by this emitter once `token` is cancelled.
    #[must_use]
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Start a new, independent part stream.
    ///
    /// Nothing is emitted until the cache holds a frame. The stream never ends
    /// on its own: it stops when dropped or when the shutdown token fires, and
    /// after that it reads the cache no more.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use framerelay::{cache::LatestFrameCache, emitter::StreamEmitter, frame::Frame};
    /// use futures::StreamExt;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let cache = Arc::new(LatestFrameCache::new());
    /// cache.publish(Frame::new(&b"JPEG"[..]));
    ///
    /// let mut parts = StreamEmitter::new(cache).stream();
    /// let part = parts.next().await.expect("a part");
    /// assert!(part.ends_with(b"JPEG\r\n"));
    /// # }
    /// ```
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, Bytes> {
        let state = Sampler {
            cache: Arc::clone(&self.cache),
            config: self.config,
            shutdown: self.shutdown.clone(),
            next_delay: None,
            _consumer: ConsumerGuard::attach(),
        };
        stream::unfold(state, |mut state| async move {
            let chunk = state.next_chunk().await?;
            Some((chunk, state))
        })
        .fuse()
        .boxed()
    }
}

struct Sampler {
    cache: Arc<LatestFrameCache>,
    config: EmitterConfig,
    shutdown: CancellationToken,
    next_delay: Option<Duration>,
    _consumer: ConsumerGuard,
}

impl Sampler {
    async fn next_chunk(&mut self) -> Option<Bytes> {
        if let Some(delay) = self.next_delay.take() {
            self.pause(delay).await?;
        }
        loop {
            if self.shutdown.is_cancelled() {
                return None;
            }
            if let Some(frame) = self.cache.read_latest() {
                self.next_delay = Some(self.config.cadence);
                metrics::inc_chunks_emitted();
                return Some(encode_chunk(&frame));
            }
            self.pause(self.config.idle_poll).await?;
        }
    }

    async fn pause(&self, duration: Duration) -> Option<()> {
        select! {
            biased;
            () = self.shutdown.cancelled() => None,
            () = sleep(duration) => Some(()),
        }
    }
}

/// Tracks one attached consumer for logs and the consumers gauge.
struct ConsumerGuard;

impl ConsumerGuard {
    fn attach() -> Self {
        metrics::inc_consumers();
        info!("stream consumer attached");
        Self
    }
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        metrics::dec_consumers();
        debug!("stream consumer detached");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use rstest::{fixture, rstest};
    use tokio::time::{Duration, Instant, timeout};
    use tokio_util::sync::CancellationToken;

    use super::*;

    #[fixture]
    fn cache() -> Arc<LatestFrameCache> { Arc::new(LatestFrameCache::new()) }

    fn payload_of(chunk: &[u8]) -> &[u8] {
        chunk
            .strip_prefix(PART_HEADER)
            .and_then(|rest| rest.strip_suffix(PART_TRAILER))
            .expect("well-formed part")
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn empty_cache_emits_nothing(cache: Arc<LatestFrameCache>) {
        let mut parts = StreamEmitter::new(cache).stream();
        let res = timeout(Duration::from_secs(5), parts.next()).await;
        assert!(res.is_err(), "no part may be emitted before a publish");
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn first_part_follows_first_publish(cache: Arc<LatestFrameCache>) {
        let mut parts = StreamEmitter::new(Arc::clone(&cache)).stream();
        let start = Instant::now();
        let publisher = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move {
                tokio::time::sleep(Duration::from_millis(250)).await;
                cache.publish(Frame::new(&b"late"[..]));
            }
        });

        let part = parts.next().await.expect("part");
        assert_eq!(payload_of(&part), b"late");
        // Picked up on the next idle poll after the publish.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        publisher.await.expect("join");
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn static_cache_repeats_identical_parts_at_cadence(cache: Arc<LatestFrameCache>) {
        cache.publish(Frame::new(vec![7_u8; 1000]));
        let mut parts = StreamEmitter::new(cache).stream();

        let first = parts.next().await.expect("first");
        let start = Instant::now();
        let second = parts.next().await.expect("second");
        let third = parts.next().await.expect("third");

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(start.elapsed(), DEFAULT_CADENCE * 2);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn always_serves_the_latest_frame(cache: Arc<LatestFrameCache>) {
        let mut parts = StreamEmitter::new(Arc::clone(&cache)).stream();
        cache.publish(Frame::new(vec![b'a'; 1000]));
        assert_eq!(payload_of(&parts.next().await.expect("a")), &[b'a'; 1000]);

        cache.publish(Frame::new(vec![b'b'; 500]));
        cache.publish(Frame::new(vec![b'c'; 10]));
        assert_eq!(payload_of(&parts.next().await.expect("c")), &[b'c'; 10]);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn independent_consumers_see_the_same_frame(cache: Arc<LatestFrameCache>) {
        let emitter = StreamEmitter::new(Arc::clone(&cache));
        let mut early = emitter.stream();
        cache.publish(Frame::new(&b"shared"[..]));

        let a = early.next().await.expect("early consumer");
        tokio::time::sleep(Duration::from_millis(7)).await;
        let mut late = emitter.stream();
        let b = late.next().await.expect("late consumer");
        assert_eq!(a, b);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_the_stream(cache: Arc<LatestFrameCache>) {
        cache.publish(Frame::new(&b"x"[..]));
        let token = CancellationToken::new();
        let mut parts = StreamEmitter::new(cache)
            .shutdown_token(token.clone())
            .stream();
        parts.next().await.expect("part before shutdown");

        token.cancel();
        assert!(parts.next().await.is_none());
        assert!(parts.next().await.is_none());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn custom_cadence_is_honoured(cache: Arc<LatestFrameCache>) {
        cache.publish(Frame::new(&b"x"[..]));
        let mut parts = StreamEmitter::new(cache)
            .config(EmitterConfig {
                cadence: Duration::from_millis(200),
                idle_poll: Duration::from_millis(10),
            })
            .stream();
        parts.next().await.expect("first");
        let start = Instant::now();
        parts.next().await.expect("second");
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[test]
    fn empty_frame_still_produces_a_well_formed_part() {
        let chunk = encode_chunk(&Frame::new(Vec::<u8>::new()));
        assert_eq!(payload_of(&chunk), b"");
    }
}
