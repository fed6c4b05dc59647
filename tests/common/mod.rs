//! Helpers shared by integration tests.
#![allow(dead_code, reason = "each test binary uses a subset")]

use std::{sync::Arc, time::Duration};

use framerelay::{Frame, LatestFrameCache};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    time::{sleep, timeout},
};

/// Write `payload` as one length-prefixed frame.
pub async fn send_raw(stream: &mut TcpStream, payload: &[u8]) {
    let len = u32::try_from(payload.len()).expect("payload fits u32");
    let mut message = len.to_be_bytes().to_vec();
    message.extend_from_slice(payload);
    stream.write_all(&message).await.expect("write frame");
}

/// Wait until the cache holds a frame satisfying `pred`.
pub async fn wait_for(cache: &Arc<LatestFrameCache>, pred: impl Fn(&Frame) -> bool) -> Frame {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Some(frame) = cache.read_latest()
                && pred(&frame)
            {
                return frame;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("expected frame never reached the cache")
}
