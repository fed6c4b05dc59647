//! HTTP surface serving the live stream to browsers.
//!
//! | Path | Response |
//! |------|----------|
//! | `/` | HTML page embedding the stream and a local clock |
//! | `/video_feed` | `multipart/x-mixed-replace` stream of JPEG parts |
//!
//! Each `/video_feed` request gets its own emitter stream. When the browser
//! disconnects the response body is dropped, which ends that stream.

use std::{convert::Infallible, io};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::emitter::{STREAM_CONTENT_TYPE, StreamEmitter};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>framerelay live stream</title>
</head>
<body>
  <h1>Live stream</h1>
  <img src="/video_feed" width="640" height="480" alt="live stream">
  <p>Local time: <span id="time"></span></p>
  <script>
    function updateTime() {
      document.getElementById('time').innerText = new Date().toLocaleTimeString();
    }
    setInterval(updateTime, 1000);
    updateTime();
  </script>
</body>
</html>
"#;

/// Build the router for the stream page and feed.
pub fn router(emitter: StreamEmitter) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        .with_state(emitter)
}

/// Serve [`router`] on `listener` until `shutdown` is cancelled.
///
/// The emitter should observe the same token so open streams end and the
/// graceful shutdown can complete.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    emitter: StreamEmitter,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let local_addr = listener.local_addr().ok();
    info!(?local_addr, "http server listening");
    axum::serve(listener, router(emitter))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!(?local_addr, "http server stopped");
    Ok(())
}

async fn index() -> Html<&'static str> { Html(INDEX_HTML) }

async fn video_feed(State(emitter): State<StreamEmitter>) -> Response {
    let body = Body::from_stream(emitter.stream().map(Ok::<_, Infallible>));
    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
